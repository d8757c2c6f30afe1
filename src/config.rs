//! Engine settings stored in the `app_config` table.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::kpi::KpiConfig;
use crate::storage::repository;

pub const AGEING_CUTOFF_YEAR: &str = "ageing_cutoff_year";
pub const PRDI_SPT_DAYS: &str = "prdi_spt_days";
pub const DEFAULT_RECIPIENT: &str = "default_recipient";
pub const PERSIST_DAILY_SNAPSHOTS: &str = "persist_daily_snapshots";
pub const CALCULATED_BY: &str = "calculated_by";
pub const ISSUES_LIMIT: &str = "issues_limit";

/// Every key the engine reads.
pub const KEYS: [&str; 6] = [
    AGEING_CUTOFF_YEAR,
    PRDI_SPT_DAYS,
    DEFAULT_RECIPIENT,
    PERSIST_DAILY_SNAPSHOTS,
    CALCULATED_BY,
    ISSUES_LIMIT,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub ageing_cutoff_year: i32,
    pub prdi_spt_days: f64,
    pub default_recipient: String,
    pub persist_daily_snapshots: bool,
    pub calculated_by: String,
    /// Maximum delayed work orders listed in the daily report.
    pub issues_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let kpi = KpiConfig::default();
        Self {
            ageing_cutoff_year: kpi.ageing_cutoff_year,
            prdi_spt_days: kpi.prdi_spt_days,
            default_recipient: "kpi-reports@localhost".to_string(),
            persist_daily_snapshots: true,
            calculated_by: "daily-report".to_string(),
            issues_limit: 10,
        }
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> Error {
    Error::Config(format!("{key} = {value:?}: expected {expected}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "a boolean")),
    }
}

impl EngineConfig {
    pub fn kpi_config(&self) -> KpiConfig {
        KpiConfig {
            ageing_cutoff_year: self.ageing_cutoff_year,
            prdi_spt_days: self.prdi_spt_days,
        }
    }

    /// Apply one stored setting. Unknown keys are ignored.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            AGEING_CUTOFF_YEAR => {
                self.ageing_cutoff_year = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(key, value, "a year"))?;
            }
            PRDI_SPT_DAYS => {
                let days: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(key, value, "a number of days"))?;
                if !(days.is_finite() && days > 0.0) {
                    return Err(invalid(key, value, "a positive number of days"));
                }
                self.prdi_spt_days = days;
            }
            DEFAULT_RECIPIENT => {
                if value.trim().is_empty() {
                    return Err(invalid(key, value, "a recipient address"));
                }
                self.default_recipient = value.trim().to_string();
            }
            PERSIST_DAILY_SNAPSHOTS => self.persist_daily_snapshots = parse_bool(key, value)?,
            CALCULATED_BY => self.calculated_by = value.to_string(),
            ISSUES_LIMIT => {
                self.issues_limit = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(key, value, "a non-negative integer"))?;
            }
            _ => log::debug!("Ignoring unknown config key {key}"),
        }
        Ok(())
    }

    /// Check a value before storing it.
    pub fn validate(key: &str, value: &str) -> Result<()> {
        if !KEYS.contains(&key) {
            return Err(Error::Config(format!(
                "unknown key {key:?} (known: {})",
                KEYS.join(", ")
            )));
        }
        EngineConfig::default().apply(key, value)
    }

    /// Defaults overlaid with whatever `app_config` holds.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut config = Self::default();
        for (key, value) in repository::list_config(conn)? {
            config.apply(&key, &value)?;
        }
        Ok(config)
    }
}

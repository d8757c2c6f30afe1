use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{stored_instant, Clock};
use crate::error::{Error, Result};
use crate::kpi::{KpiReport, KpiType};
use crate::status::KpiTarget;

/// An immutable record of one indicator value as computed at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    /// Assigned by the store on append.
    pub id: Option<i64>,
    pub kpi_type: KpiType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub value: f64,
    pub target_value: Option<f64>,
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,
    pub sample_size: u64,
    pub calculated_at: DateTime<Utc>,
    pub calculated_by: String,
}

impl KpiSnapshot {
    /// One snapshot per indicator in `report`, all stamped with the same instant.
    pub fn from_report<F>(
        report: &KpiReport,
        clock: &dyn Clock,
        calculated_by: &str,
        mut target_for: F,
    ) -> Vec<KpiSnapshot>
    where
        F: FnMut(KpiType) -> Option<KpiTarget>,
    {
        let calculated_at = stored_instant(clock);
        report
            .results
            .iter()
            .map(|(kpi, result)| KpiSnapshot {
                id: None,
                kpi_type: *kpi,
                period_start: report.period.start,
                period_end: report.period.end,
                value: result.value,
                target_value: target_for(*kpi).map(|t| t.target_value),
                numerator: result.numerator,
                denominator: result.denominator,
                sample_size: result.sample_size,
                calculated_at,
                calculated_by: calculated_by.to_string(),
            })
            .collect()
    }
}

/// Newest period first, then newest calculation, then newest id.
pub fn sort_newest_first(snapshots: &mut [KpiSnapshot]) {
    snapshots.sort_by(|a, b| {
        b.period_end
            .cmp(&a.period_end)
            .then_with(|| b.calculated_at.cmp(&a.calculated_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Fixed-width UTC form so stored timestamps sort lexically.
pub(crate) fn format_instant(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::DataSource(format!("bad timestamp {s:?}: {e}")))
}

pub mod scorecard;

pub use scorecard::{Scorecard, ScorecardEntry};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::kpi::KpiType;

/// Classification of one indicator against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiStatus {
    Good,
    Warning,
    Bad,
    /// No target configured.
    Neutral,
}

impl KpiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KpiStatus::Good => "good",
            KpiStatus::Warning => "warning",
            KpiStatus::Bad => "bad",
            KpiStatus::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for KpiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headline status across the indicators in [`HEADLINE_KPIS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Good,
    Warning,
    Critical,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Good => "good",
            OverallStatus::Warning => "warning",
            OverallStatus::Critical => "critical",
        }
    }

    /// Subject-line banner for the daily report.
    pub fn headline(&self) -> &'static str {
        match self {
            OverallStatus::Good => "All Systems OK",
            OverallStatus::Warning => "Attention Needed",
            OverallStatus::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured goal for one indicator over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiTarget {
    pub kpi_type: KpiType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub target_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub green_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yellow_threshold: Option<f64>,
}

impl KpiTarget {
    pub fn new(kpi_type: KpiType, period_start: NaiveDate, period_end: NaiveDate, target_value: f64) -> Self {
        Self {
            kpi_type,
            period_start,
            period_end,
            target_value,
            green_threshold: None,
            yellow_threshold: None,
        }
    }

    pub fn with_thresholds(mut self, green: Option<f64>, yellow: Option<f64>) -> Self {
        self.green_threshold = green;
        self.yellow_threshold = yellow;
        self
    }

    /// Value at or above which the indicator is good.
    pub fn green(&self) -> f64 {
        self.green_threshold.unwrap_or(self.target_value)
    }

    /// Value at or above which the indicator is at least a warning.
    pub fn yellow(&self) -> f64 {
        self.yellow_threshold.unwrap_or(self.target_value * 0.8)
    }
}

/// Indicators folded into the overall status.
pub const HEADLINE_KPIS: [KpiType; 4] = [
    KpiType::Ccti,
    KpiType::PcaConversion,
    KpiType::AgeingCompletion,
    KpiType::QualityIndex,
];

/// Classify `value` against `target`. Higher is better for every indicator.
pub fn classify(value: f64, target: Option<&KpiTarget>) -> KpiStatus {
    let Some(target) = target else {
        return KpiStatus::Neutral;
    };
    if value >= target.green() {
        KpiStatus::Good
    } else if value >= target.yellow() {
        KpiStatus::Warning
    } else {
        KpiStatus::Bad
    }
}

/// Fold headline statuses: two or more bad is critical; one bad or two
/// warnings is a warning.
pub fn resolve_overall<I>(statuses: I) -> OverallStatus
where
    I: IntoIterator<Item = KpiStatus>,
{
    let (mut bad, mut warning) = (0usize, 0usize);
    for status in statuses {
        match status {
            KpiStatus::Bad => bad += 1,
            KpiStatus::Warning => warning += 1,
            KpiStatus::Good | KpiStatus::Neutral => {}
        }
    }
    if bad >= 2 {
        OverallStatus::Critical
    } else if bad >= 1 || warning >= 2 {
        OverallStatus::Warning
    } else {
        OverallStatus::Good
    }
}

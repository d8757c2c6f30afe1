use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::query::period::ReportingPeriod;

/// The eight indicators the engine computes, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiType {
    /// Customer Connection Timeliness Index.
    Ccti,
    PcaConversion,
    AgeingCompletion,
    TerminationApt,
    /// Project Resolution Duration Index.
    Prdi,
    CostSettlement,
    QualityIndex,
    CapabilityUtilization,
}

impl KpiType {
    pub const ALL: [KpiType; 8] = [
        KpiType::Ccti,
        KpiType::PcaConversion,
        KpiType::AgeingCompletion,
        KpiType::TerminationApt,
        KpiType::Prdi,
        KpiType::CostSettlement,
        KpiType::QualityIndex,
        KpiType::CapabilityUtilization,
    ];

    /// Stable key used in storage and serialized reports.
    pub fn key(&self) -> &'static str {
        match self {
            KpiType::Ccti => "ccti",
            KpiType::PcaConversion => "pca_conversion",
            KpiType::AgeingCompletion => "ageing_completion",
            KpiType::TerminationApt => "termination_apt",
            KpiType::Prdi => "prdi",
            KpiType::CostSettlement => "cost_settlement",
            KpiType::QualityIndex => "quality_index",
            KpiType::CapabilityUtilization => "capability_utilization",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            KpiType::Ccti => "CCTI",
            KpiType::PcaConversion => "PCA Conversion",
            KpiType::AgeingCompletion => "Ageing Completion",
            KpiType::TerminationApt => "Termination APT",
            KpiType::Prdi => "PRDI",
            KpiType::CostSettlement => "Cost Settlement",
            KpiType::QualityIndex => "Quality Index",
            KpiType::CapabilityUtilization => "Capability Util.",
        }
    }

    /// Display suffix for values of this indicator.
    pub fn unit(&self) -> &'static str {
        match self {
            KpiType::Ccti | KpiType::Prdi => "",
            KpiType::TerminationApt => " days",
            _ => "%",
        }
    }

    /// Decimal places the indicator value is rounded to.
    pub fn precision(&self) -> u32 {
        match self {
            KpiType::Ccti | KpiType::Prdi => 4,
            _ => 2,
        }
    }
}

impl std::fmt::Display for KpiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for KpiType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('-', "_");
        KpiType::ALL
            .into_iter()
            .find(|k| k.key() == needle)
            .ok_or_else(|| Error::NotFound(format!("unknown KPI type: {s}")))
    }
}

/// Per-record or per-component contribution to an indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailRow {
    Timeliness {
        wo_no: String,
        duration_days: i64,
        spt_hours: f64,
        spt_load: f64,
        component: f64,
    },
    ProcessingTime {
        wo_no: String,
        processing_days: i64,
    },
    Resolution {
        wo_no: String,
        duration_days: i64,
        component: f64,
    },
    /// A labelled count or amount feeding a ratio.
    Breakdown { label: String, value: f64 },
    Vendor {
        vendor_id: String,
        vendor_name: String,
        accomplishment: f64,
        capability: f64,
        utilization: f64,
    },
}

impl DetailRow {
    pub(crate) fn breakdown(label: &str, value: f64) -> Self {
        DetailRow::Breakdown {
            label: label.to_string(),
            value,
        }
    }
}

/// Output of one indicator calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    pub value: f64,
    /// Records (or vendor rows) the value was computed over.
    pub sample_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<f64>,
    pub details: Vec<DetailRow>,
}

impl KpiResult {
    /// The result for a period with nothing to measure.
    pub fn empty() -> Self {
        Self {
            value: 0.0,
            sample_size: 0,
            numerator: None,
            denominator: None,
            details: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_size == 0
    }
}

/// Tunables the calculators read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiConfig {
    /// Work orders received in or before this year count as ageing backlog.
    pub ageing_cutoff_year: i32,
    /// Divisor for PRDI durations.
    pub prdi_spt_days: f64,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            ageing_cutoff_year: 2024,
            prdi_spt_days: 60.0,
        }
    }
}

/// All indicators for one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub period: ReportingPeriod,
    pub results: BTreeMap<KpiType, KpiResult>,
}

impl KpiReport {
    pub fn get(&self, kpi: KpiType) -> Option<&KpiResult> {
        self.results.get(&kpi)
    }

    /// Indicator value, zero when absent.
    pub fn value(&self, kpi: KpiType) -> f64 {
        self.get(kpi).map_or(0.0, |r| r.value)
    }
}

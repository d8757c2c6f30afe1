use serde::{Deserialize, Serialize};

use crate::kpi::{KpiReport, KpiType};
use crate::query::period::ReportingPeriod;
use crate::status::{classify, resolve_overall, KpiStatus, KpiTarget, OverallStatus, HEADLINE_KPIS};

/// One indicator row: its value, the target it was judged against and the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardEntry {
    pub kpi_type: KpiType,
    pub value: f64,
    pub sample_size: u64,
    pub target: Option<KpiTarget>,
    pub status: KpiStatus,
}

impl ScorecardEntry {
    pub fn is_headline(&self) -> bool {
        HEADLINE_KPIS.contains(&self.kpi_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub period: ReportingPeriod,
    pub entries: Vec<ScorecardEntry>,
    pub overall: OverallStatus,
}

impl Scorecard {
    /// Classify every indicator of `report`. `target_for` supplies the active
    /// target of an indicator, if any.
    pub fn build<F>(report: &KpiReport, mut target_for: F) -> Self
    where
        F: FnMut(KpiType) -> Option<KpiTarget>,
    {
        let entries: Vec<ScorecardEntry> = report
            .results
            .iter()
            .map(|(kpi, result)| {
                let target = target_for(*kpi);
                ScorecardEntry {
                    kpi_type: *kpi,
                    value: result.value,
                    sample_size: result.sample_size,
                    status: classify(result.value, target.as_ref()),
                    target,
                }
            })
            .collect();
        let overall = resolve_overall(
            HEADLINE_KPIS
                .iter()
                .map(|kpi| {
                    entries
                        .iter()
                        .find(|e| e.kpi_type == *kpi)
                        .map_or(KpiStatus::Neutral, |e| e.status)
                }),
        );
        Self {
            period: report.period,
            entries,
            overall,
        }
    }

    pub fn entry(&self, kpi: KpiType) -> Option<&ScorecardEntry> {
        self.entries.iter().find(|e| e.kpi_type == kpi)
    }
}

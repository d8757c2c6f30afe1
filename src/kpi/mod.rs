pub mod calculators;
pub mod spt;
pub mod types;

pub use types::{DetailRow, KpiConfig, KpiReport, KpiResult, KpiType};

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::query::period::ReportingPeriod;
use crate::source::RecordSource;

/// Compute a single indicator.
pub fn calculate<S: RecordSource + ?Sized>(
    source: &S,
    kpi: KpiType,
    period: &ReportingPeriod,
    config: &KpiConfig,
) -> Result<KpiResult> {
    match kpi {
        KpiType::Ccti => calculators::ccti(source, period),
        KpiType::PcaConversion => calculators::pca_conversion(source, period),
        KpiType::AgeingCompletion => calculators::ageing_completion_with(source, period, config),
        KpiType::TerminationApt => calculators::termination_apt(source, period),
        KpiType::Prdi => calculators::prdi_with(source, period, config),
        KpiType::CostSettlement => calculators::cost_settlement(source),
        KpiType::QualityIndex => calculators::quality_index(source, period),
        KpiType::CapabilityUtilization => calculators::capability_utilization(source, period),
    }
}

/// Compute every indicator for `period`, in [`KpiType::ALL`] order.
///
/// The first failing calculator aborts the run; the error names the
/// indicator it came from.
pub fn calculate_all<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
    config: &KpiConfig,
) -> Result<KpiReport> {
    let mut results = BTreeMap::new();
    for kpi in KpiType::ALL {
        let result = calculate(source, kpi, period, config).map_err(|e| match e {
            Error::Calculation { .. } => e,
            other => Error::Calculation {
                kpi,
                message: other.to_string(),
            },
        })?;
        log::debug!(
            "{} for {}: {} (n={})",
            kpi.label(),
            period,
            result.value,
            result.sample_size
        );
        results.insert(kpi, result);
    }
    Ok(KpiReport {
        period: *period,
        results,
    })
}

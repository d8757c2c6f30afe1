pub mod memory;
pub mod records;

pub use memory::MemoryStore;
pub use records::{VendorProductivity, WorkOrder, WorkOrderStatus};

use chrono::NaiveDate;

use crate::error::Result;
use crate::kpi::KpiType;
use crate::query::filter::{AmountField, WorkOrderFilter};
use crate::query::period::ReportingPeriod;
use crate::snapshot::KpiSnapshot;
use crate::status::KpiTarget;

/// Read-only access to the operational records indicators are computed from.
///
/// Implementations must not mutate records. Failures surface as
/// [`crate::Error::DataSource`].
pub trait RecordSource {
    fn work_orders(&self, filter: &WorkOrderFilter) -> Result<Vec<WorkOrder>>;

    fn count_work_orders(&self, filter: &WorkOrderFilter) -> Result<u64> {
        Ok(self.work_orders(filter)?.len() as u64)
    }

    /// Sum of `field` over matching work orders, missing values counting as zero.
    fn sum_amount(&self, filter: &WorkOrderFilter, field: AmountField) -> Result<f64> {
        Ok(self
            .work_orders(filter)?
            .iter()
            .filter_map(|wo| field.get(wo))
            .sum())
    }

    /// Productivity rows for the month starting on `month`.
    fn vendor_productivity(&self, month: NaiveDate) -> Result<Vec<VendorProductivity>>;

    /// Open delayed work orders, longest delay first.
    fn delayed_work_orders(&self, limit: usize) -> Result<Vec<WorkOrder>> {
        let filter = WorkOrderFilter::new().delayed().status_in(&[
            WorkOrderStatus::New,
            WorkOrderStatus::ForAudit,
            WorkOrderStatus::NoCoc,
        ]);
        let mut rows = self.work_orders(&filter)?;
        rows.sort_by(|a, b| b.delay_days.cmp(&a.delay_days).then_with(|| a.wo_no.cmp(&b.wo_no)));
        rows.truncate(limit);
        Ok(rows)
    }
}

/// Lookup of the active target for an indicator and period.
pub trait TargetSource {
    fn active_target(&self, kpi: KpiType, period: &ReportingPeriod) -> Result<Option<KpiTarget>>;
}

/// Append-only destination for snapshots.
pub trait SnapshotSink {
    /// Append every snapshot or none of them.
    fn append_snapshots(&self, snapshots: &[KpiSnapshot]) -> Result<Vec<i64>>;
}

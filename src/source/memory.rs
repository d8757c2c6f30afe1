use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::error::Result;
use crate::kpi::KpiType;
use crate::notify::{NotificationLog, NotificationLogEntry, NotificationStatus, NotificationType};
use crate::query::filter::WorkOrderFilter;
use crate::query::period::ReportingPeriod;
use crate::snapshot::{sort_newest_first, KpiSnapshot};
use crate::source::{RecordSource, SnapshotSink, TargetSource, VendorProductivity, WorkOrder};
use crate::status::KpiTarget;

/// An in-process store holding every record the engine reads or appends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    work_orders: Vec<WorkOrder>,
    vendor_productivity: Vec<VendorProductivity>,
    targets: Vec<KpiTarget>,
    snapshots: Mutex<Vec<KpiSnapshot>>,
    notifications: Mutex<Vec<NotificationLogEntry>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_orders(mut self, orders: Vec<WorkOrder>) -> Self {
        self.work_orders.extend(orders);
        self
    }

    pub fn with_vendor_productivity(mut self, rows: Vec<VendorProductivity>) -> Self {
        self.vendor_productivity.extend(rows);
        self
    }

    /// Later targets for the same key replace earlier ones.
    pub fn with_target(mut self, target: KpiTarget) -> Self {
        self.targets.retain(|t| {
            !(t.kpi_type == target.kpi_type
                && t.period_start == target.period_start
                && t.period_end == target.period_end)
        });
        self.targets.push(target);
        self
    }

    pub fn push_work_order(&mut self, wo: WorkOrder) {
        self.work_orders.push(wo);
    }

    /// Snapshots for `kpi`, newest first.
    pub fn snapshots(&self, kpi: KpiType) -> Vec<KpiSnapshot> {
        let mut out: Vec<KpiSnapshot> = lock(&self.snapshots)
            .iter()
            .filter(|s| s.kpi_type == kpi)
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        out
    }

    pub fn notification_entries(&self) -> Vec<NotificationLogEntry> {
        lock(&self.notifications).clone()
    }
}

impl RecordSource for MemoryStore {
    fn work_orders(&self, filter: &WorkOrderFilter) -> Result<Vec<WorkOrder>> {
        Ok(self
            .work_orders
            .iter()
            .filter(|wo| filter.matches(wo))
            .cloned()
            .collect())
    }

    fn vendor_productivity(&self, month: NaiveDate) -> Result<Vec<VendorProductivity>> {
        Ok(self
            .vendor_productivity
            .iter()
            .filter(|r| r.month == month)
            .cloned()
            .collect())
    }
}

/// Exact period match wins; otherwise the covering target with the latest start.
pub(crate) fn select_target<'a, I>(targets: I, kpi: KpiType, period: &ReportingPeriod) -> Option<&'a KpiTarget>
where
    I: IntoIterator<Item = &'a KpiTarget>,
{
    let candidates: Vec<&KpiTarget> = targets
        .into_iter()
        .filter(|t| t.kpi_type == kpi && t.period_start <= period.start && t.period_end >= period.end)
        .collect();
    candidates
        .iter()
        .find(|t| t.period_start == period.start && t.period_end == period.end)
        .or_else(|| candidates.iter().max_by_key(|t| (t.period_start, std::cmp::Reverse(t.period_end))))
        .copied()
}

impl TargetSource for MemoryStore {
    fn active_target(&self, kpi: KpiType, period: &ReportingPeriod) -> Result<Option<KpiTarget>> {
        Ok(select_target(&self.targets, kpi, period).cloned())
    }
}

impl SnapshotSink for MemoryStore {
    fn append_snapshots(&self, snapshots: &[KpiSnapshot]) -> Result<Vec<i64>> {
        let mut stored = lock(&self.snapshots);
        let mut ids = Vec::with_capacity(snapshots.len());
        for snap in snapshots {
            let id = stored.len() as i64 + 1;
            let mut snap = snap.clone();
            snap.id = Some(id);
            stored.push(snap);
            ids.push(id);
        }
        Ok(ids)
    }
}

impl NotificationLog for MemoryStore {
    fn sent_exists(
        &self,
        notification_type: NotificationType,
        date: NaiveDate,
        recipient: &str,
    ) -> Result<bool> {
        Ok(lock(&self.notifications).iter().any(|e| {
            e.status == NotificationStatus::Sent
                && e.notification_type == notification_type
                && e.notification_date == date
                && e.recipient == recipient
        }))
    }

    fn append_entry(&self, entry: &NotificationLogEntry) -> Result<bool> {
        let mut entries = lock(&self.notifications);
        if entry.status == NotificationStatus::Sent
            && entries.iter().any(|e| {
                e.status == NotificationStatus::Sent
                    && e.notification_type == entry.notification_type
                    && e.notification_date == entry.notification_date
                    && e.recipient == entry.recipient
            })
        {
            return Ok(false);
        }
        let mut entry = entry.clone();
        entry.id = Some(entries.len() as i64 + 1);
        entries.push(entry);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::WorkOrderStatus;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_target_prefers_exact_then_latest_covering() {
        let jan = ReportingPeriod::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let store = MemoryStore::new()
            .with_target(KpiTarget::new(KpiType::Ccti, d(2024, 1, 1), d(2024, 12, 31), 1.0))
            .with_target(KpiTarget::new(KpiType::Ccti, d(2023, 7, 1), d(2024, 6, 30), 2.0));
        let t = store.active_target(KpiType::Ccti, &jan).unwrap().unwrap();
        assert_eq!(t.target_value, 1.0);

        let store = store.with_target(KpiTarget::new(KpiType::Ccti, d(2024, 1, 1), d(2024, 1, 31), 3.0));
        let t = store.active_target(KpiType::Ccti, &jan).unwrap().unwrap();
        assert_eq!(t.target_value, 3.0);

        assert!(store.active_target(KpiType::Prdi, &jan).unwrap().is_none());
    }

    #[test]
    fn test_with_target_replaces_same_key() {
        let store = MemoryStore::new()
            .with_target(KpiTarget::new(KpiType::Ccti, d(2024, 1, 1), d(2024, 1, 31), 1.0))
            .with_target(KpiTarget::new(KpiType::Ccti, d(2024, 1, 1), d(2024, 1, 31), 4.0));
        let jan = ReportingPeriod::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert_eq!(store.active_target(KpiType::Ccti, &jan).unwrap().unwrap().target_value, 4.0);
    }

    #[test]
    fn test_delayed_work_orders_ordering() {
        let mut store = MemoryStore::new();
        for (no, status, days) in [
            ("A", WorkOrderStatus::New, 3),
            ("B", WorkOrderStatus::ForAudit, 9),
            ("C", WorkOrderStatus::Paid, 50),
            ("D", WorkOrderStatus::NoCoc, 9),
        ] {
            let mut wo = WorkOrder::new(no, status);
            wo.is_delayed = true;
            wo.delay_days = days;
            store.push_work_order(wo);
        }
        store.push_work_order(WorkOrder::new("E", WorkOrderStatus::New));

        let rows = store.delayed_work_orders(2).unwrap();
        let ids: Vec<&str> = rows.iter().map(|w| w.wo_no.as_str()).collect();
        assert_eq!(ids, vec!["B", "D"]);
    }
}

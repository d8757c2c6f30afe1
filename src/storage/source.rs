//! The warehouse connection as a record source, target lookup, snapshot sink
//! and notification log.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::error::{Error, Result};
use crate::kpi::KpiType;
use crate::notify::{NotificationLog, NotificationLogEntry, NotificationType};
use crate::query::filter::{AmountField, WorkOrderFilter};
use crate::query::period::ReportingPeriod;
use crate::snapshot::KpiSnapshot;
use crate::source::{RecordSource, SnapshotSink, TargetSource, VendorProductivity, WorkOrder};
use crate::status::KpiTarget;
use crate::storage::repository;

fn source_err(e: rusqlite::Error) -> Error {
    Error::DataSource(e.to_string())
}

impl RecordSource for Connection {
    fn work_orders(&self, filter: &WorkOrderFilter) -> Result<Vec<WorkOrder>> {
        repository::query_work_orders(self, filter).map_err(source_err)
    }

    fn count_work_orders(&self, filter: &WorkOrderFilter) -> Result<u64> {
        let n = repository::count_work_orders(self, filter).map_err(source_err)?;
        Ok(n.max(0) as u64)
    }

    fn sum_amount(&self, filter: &WorkOrderFilter, field: AmountField) -> Result<f64> {
        repository::sum_amount(self, filter, field).map_err(source_err)
    }

    fn vendor_productivity(&self, month: NaiveDate) -> Result<Vec<VendorProductivity>> {
        repository::vendor_productivity_for_month(self, month).map_err(source_err)
    }

    fn delayed_work_orders(&self, limit: usize) -> Result<Vec<WorkOrder>> {
        repository::delayed_work_orders(self, limit).map_err(source_err)
    }
}

impl TargetSource for Connection {
    fn active_target(&self, kpi: KpiType, period: &ReportingPeriod) -> Result<Option<KpiTarget>> {
        Ok(repository::find_active_target(self, kpi, period)?)
    }
}

impl SnapshotSink for Connection {
    fn append_snapshots(&self, snapshots: &[KpiSnapshot]) -> Result<Vec<i64>> {
        Ok(repository::insert_snapshots(self, snapshots)?)
    }
}

impl NotificationLog for Connection {
    fn sent_exists(
        &self,
        notification_type: NotificationType,
        date: NaiveDate,
        recipient: &str,
    ) -> Result<bool> {
        Ok(repository::notification_sent_exists(
            self,
            notification_type,
            date,
            recipient,
        )?)
    }

    fn append_entry(&self, entry: &NotificationLogEntry) -> Result<bool> {
        Ok(repository::insert_notification(self, entry)?)
    }
}

pub mod clock;
pub mod config;
pub mod daily;
pub mod date_util;
pub mod error;
pub mod kpi;
pub mod notify;
pub mod query;
pub mod snapshot;
pub mod source;
pub mod status;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use daily::{run_daily_report, DailyRunOutcome};
pub use error::{Error, Result};
pub use kpi::{calculate_all, DetailRow, KpiConfig, KpiReport, KpiResult, KpiType};
pub use notify::{
    LogSink, Notification, NotificationLogEntry, NotificationSink, NotificationStatus,
    NotificationType, OutboxSink,
};
pub use query::period::{Period, ReportingPeriod};
pub use snapshot::KpiSnapshot;
pub use source::{MemoryStore, RecordSource, VendorProductivity, WorkOrder, WorkOrderStatus};
pub use status::{classify, resolve_overall, KpiStatus, KpiTarget, OverallStatus, Scorecard};
pub use storage::Database;

use std::sync::Arc;

use source::TargetSource;
use storage::repository;

/// Main entry point: the KPI engine over a warehouse database.
///
/// Each operation runs as one unit of work on a single connection: reads
/// through the reader, anything that appends through the writer.
#[derive(Clone)]
pub struct KpiEngine {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl KpiEngine {
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Config ───────────────────────────────────────────────────

    pub async fn config(&self) -> Result<EngineConfig> {
        self.db
            .reader()
            .call(|conn| Ok::<_, rusqlite::Error>(EngineConfig::load(conn)))
            .await?
    }

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::get_config(conn, &key))
            .await?)
    }

    /// Store a setting after validating it.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        EngineConfig::validate(key, value)?;
        let (key, value) = (key.to_string(), value.to_string());
        self.db
            .writer()
            .call(move |conn| repository::set_config(conn, &key, &value))
            .await?;
        Ok(())
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        Ok(self.db.reader().call(|conn| repository::list_config(conn)).await?)
    }

    // ── Records ──────────────────────────────────────────────────

    /// Insert or replace work orders in one transaction.
    pub async fn upsert_work_orders(&self, orders: Vec<WorkOrder>) -> Result<usize> {
        Ok(self
            .db
            .writer()
            .call(move |conn| {
                let tx = conn.transaction()?;
                for wo in &orders {
                    repository::upsert_work_order(&tx, wo)?;
                }
                tx.commit()?;
                Ok::<_, rusqlite::Error>(orders.len())
            })
            .await?)
    }

    pub async fn upsert_vendor_productivity(&self, rows: Vec<VendorProductivity>) -> Result<usize> {
        Ok(self
            .db
            .writer()
            .call(move |conn| {
                let tx = conn.transaction()?;
                for row in &rows {
                    repository::upsert_vendor_productivity(&tx, row)?;
                }
                tx.commit()?;
                Ok::<_, rusqlite::Error>(rows.len())
            })
            .await?)
    }

    // ── Calculation ──────────────────────────────────────────────

    /// Compute every indicator for `period`.
    pub async fn calculate(&self, period: ReportingPeriod) -> Result<KpiReport> {
        let config = self.config().await?.kpi_config();
        self.db
            .reader()
            .call(move |conn| Ok::<_, rusqlite::Error>(calculate_all(&*conn, &period, &config)))
            .await?
    }

    pub async fn calculate_one(&self, kpi: KpiType, period: ReportingPeriod) -> Result<KpiResult> {
        let config = self.config().await?.kpi_config();
        self.db
            .reader()
            .call(move |conn| Ok::<_, rusqlite::Error>(crate::kpi::calculate(&*conn, kpi, &period, &config)))
            .await?
    }

    /// Compute `period` and append one snapshot per indicator.
    pub async fn calculate_and_store(
        &self,
        period: ReportingPeriod,
        calculated_by: Option<String>,
    ) -> Result<Vec<KpiSnapshot>> {
        let config = self.config().await?;
        let clock = Arc::clone(&self.clock);
        let kpi_config = config.kpi_config();
        let calculated_by = calculated_by.unwrap_or(config.calculated_by);
        self.db
            .writer()
            .call(move |conn| {
                Ok::<_, rusqlite::Error>(store_report(
                    conn,
                    clock.as_ref(),
                    &period,
                    &kpi_config,
                    &calculated_by,
                ))
            })
            .await?
    }

    /// Stored snapshots for `kpi`, newest period first.
    pub async fn snapshot_history(&self, kpi: KpiType, limit: usize) -> Result<Vec<KpiSnapshot>> {
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::list_snapshots(conn, kpi, limit))
            .await?)
    }

    // ── Targets & status ─────────────────────────────────────────

    /// Make `target` the active target for its indicator and period.
    pub async fn set_target(&self, target: KpiTarget) -> Result<i64> {
        if target.period_start > target.period_end {
            return Err(Error::InvalidPeriod(format!(
                "{} is after {}",
                target.period_start, target.period_end
            )));
        }
        Ok(self
            .db
            .writer()
            .call(move |conn| repository::set_target(conn, &target))
            .await?)
    }

    pub async fn list_targets(&self, kpi: Option<KpiType>) -> Result<Vec<KpiTarget>> {
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::list_targets(conn, kpi))
            .await?)
    }

    /// Calculate `period` and classify every indicator against its active target.
    pub async fn evaluate(&self, period: ReportingPeriod) -> Result<Scorecard> {
        let report = self.calculate(period).await?;
        let kpis: Vec<KpiType> = report.results.keys().copied().collect();
        let targets = self
            .db
            .reader()
            .call(move |conn| {
                let mut found = Vec::new();
                for kpi in kpis {
                    if let Some(t) = repository::find_active_target(conn, kpi, &period)? {
                        found.push(t);
                    }
                }
                Ok::<_, rusqlite::Error>(found)
            })
            .await?;
        Ok(Scorecard::build(&report, |kpi| {
            targets.iter().find(|t| t.kpi_type == kpi).cloned()
        }))
    }

    // ── Daily report ─────────────────────────────────────────────

    /// Run the daily report for today's month through `sink`.
    pub async fn run_daily_report(
        &self,
        recipient: Option<String>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<DailyRunOutcome> {
        let clock = Arc::clone(&self.clock);
        self.db
            .writer()
            .call(move |conn| {
                let conn: &rusqlite::Connection = conn;
                Ok::<_, rusqlite::Error>(EngineConfig::load(conn).and_then(|config| {
                    daily::run_daily_report(
                        conn,
                        clock.as_ref(),
                        sink.as_ref(),
                        &config,
                        recipient.as_deref(),
                    )
                }))
            })
            .await?
    }

    /// Most recent notification log entries.
    pub async fn notifications(&self, limit: usize) -> Result<Vec<NotificationLogEntry>> {
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::list_notifications(conn, limit))
            .await?)
    }
}

fn store_report(
    conn: &rusqlite::Connection,
    clock: &dyn Clock,
    period: &ReportingPeriod,
    config: &KpiConfig,
    calculated_by: &str,
) -> Result<Vec<KpiSnapshot>> {
    let report = calculate_all(conn, period, config)?;
    let mut targets = Vec::new();
    for kpi in report.results.keys() {
        if let Some(t) = conn.active_target(*kpi, period)? {
            targets.push(t);
        }
    }
    let mut snapshots = KpiSnapshot::from_report(&report, clock, calculated_by, |kpi| {
        targets.iter().find(|t| t.kpi_type == kpi).cloned()
    });
    let ids = repository::insert_snapshots(conn, &snapshots)?;
    for (snap, id) in snapshots.iter_mut().zip(ids) {
        snap.id = Some(id);
    }
    log::info!("Stored {} snapshots for {}", snapshots.len(), period);
    Ok(snapshots)
}

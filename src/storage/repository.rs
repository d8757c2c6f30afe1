use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::date_util::{date_key, parse_date_key};
use crate::kpi::KpiType;
use crate::notify::{NotificationLogEntry, NotificationType};
use crate::query::filter::{AmountField, WorkOrderFilter};
use crate::query::period::ReportingPeriod;
use crate::snapshot::{format_instant, parse_instant, KpiSnapshot};
use crate::source::{VendorProductivity, WorkOrder, WorkOrderStatus};
use crate::status::KpiTarget;

fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr<Err = crate::Error>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

fn date_col(row: &Row<'_>, idx: usize) -> Result<NaiveDate, rusqlite::Error> {
    let text: String = row.get(idx)?;
    parse_date_key(&text)
        .ok_or_else(|| conversion_error(idx, crate::Error::DataSource(format!("bad date {text:?}"))))
}

fn opt_date_col(row: &Row<'_>, idx: usize) -> Result<Option<NaiveDate>, rusqlite::Error> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => date_col(row, idx).map(Some),
        None => Ok(None),
    }
}

// ── Work Orders ────────────────────────────────────────────────────

const WORK_ORDER_COLUMNS: &str = "wo_no, vendor_id, description, status, date_received, \
     date_awarding, date_energized, date_coc_received, date_for_audit, date_audited, \
     labor_hours, estimated_cost, billed_cost, is_delayed, delay_days";

pub fn upsert_work_order(conn: &Connection, wo: &WorkOrder) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO work_orders (
            wo_no, vendor_id, description, status, date_received, date_awarding,
            date_energized, date_coc_received, date_for_audit, date_audited,
            labor_hours, estimated_cost, billed_cost, is_delayed, delay_days, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, datetime('now'))",
        params![
            wo.wo_no,
            wo.vendor_id,
            wo.description,
            wo.status.as_str(),
            wo.date_received.map(date_key),
            wo.date_awarding.map(date_key),
            wo.date_energized.map(date_key),
            wo.date_coc_received.map(date_key),
            wo.date_for_audit.map(date_key),
            wo.date_audited.map(date_key),
            wo.labor_hours,
            wo.estimated_cost,
            wo.billed_cost,
            wo.is_delayed,
            wo.delay_days,
        ],
    )?;
    Ok(())
}

fn work_order_from_row(row: &Row<'_>) -> Result<WorkOrder, rusqlite::Error> {
    Ok(WorkOrder {
        wo_no: row.get(0)?,
        vendor_id: row.get(1)?,
        description: row.get(2)?,
        status: parsed::<WorkOrderStatus>(row, 3)?,
        date_received: opt_date_col(row, 4)?,
        date_awarding: opt_date_col(row, 5)?,
        date_energized: opt_date_col(row, 6)?,
        date_coc_received: opt_date_col(row, 7)?,
        date_for_audit: opt_date_col(row, 8)?,
        date_audited: opt_date_col(row, 9)?,
        labor_hours: row.get(10)?,
        estimated_cost: row.get(11)?,
        billed_cost: row.get(12)?,
        is_delayed: row.get(13)?,
        delay_days: row.get(14)?,
    })
}

pub fn get_work_order(conn: &Connection, wo_no: &str) -> Result<Option<WorkOrder>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {WORK_ORDER_COLUMNS} FROM work_orders WHERE wo_no = ?1"),
        params![wo_no],
        work_order_from_row,
    )
    .optional()
}

pub fn query_work_orders(
    conn: &Connection,
    filter: &WorkOrderFilter,
) -> Result<Vec<WorkOrder>, rusqlite::Error> {
    let (where_sql, params) = filter.build_where();
    let sql = format!("SELECT {WORK_ORDER_COLUMNS} FROM work_orders{where_sql} ORDER BY wo_no");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), work_order_from_row)?;
    rows.collect()
}

pub fn count_work_orders(conn: &Connection, filter: &WorkOrderFilter) -> Result<i64, rusqlite::Error> {
    let (where_sql, params) = filter.build_where();
    conn.query_row(
        &format!("SELECT COUNT(*) FROM work_orders{where_sql}"),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )
}

pub fn sum_amount(
    conn: &Connection,
    filter: &WorkOrderFilter,
    field: AmountField,
) -> Result<f64, rusqlite::Error> {
    let (where_sql, params) = filter.build_where();
    conn.query_row(
        &format!("SELECT COALESCE(SUM({}), 0.0) FROM work_orders{where_sql}", field.column()),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )
}

/// Open delayed work orders, longest delay first.
pub fn delayed_work_orders(conn: &Connection, limit: usize) -> Result<Vec<WorkOrder>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORK_ORDER_COLUMNS} FROM work_orders
         WHERE is_delayed = 1 AND status IN ('NEW', 'FOR AUDIT', 'NO COC')
         ORDER BY delay_days DESC, wo_no
         LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit as i64], work_order_from_row)?;
    rows.collect()
}

// ── Vendor Productivity ────────────────────────────────────────────

pub fn upsert_vendor_productivity(
    conn: &Connection,
    row: &VendorProductivity,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO vendor_productivity
            (vendor_id, vendor_name, month, monthly_accomplishment, monthly_capability)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(vendor_id, month) DO UPDATE SET
           vendor_name = excluded.vendor_name,
           monthly_accomplishment = excluded.monthly_accomplishment,
           monthly_capability = excluded.monthly_capability",
        params![
            row.vendor_id,
            row.vendor_name,
            date_key(row.month),
            row.monthly_accomplishment,
            row.monthly_capability,
        ],
    )?;
    Ok(())
}

pub fn vendor_productivity_for_month(
    conn: &Connection,
    month: NaiveDate,
) -> Result<Vec<VendorProductivity>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT vendor_id, vendor_name, month, monthly_accomplishment, monthly_capability
         FROM vendor_productivity WHERE month = ?1 ORDER BY vendor_id",
    )?;
    let rows = stmt.query_map(params![date_key(month)], |row| {
        Ok(VendorProductivity {
            vendor_id: row.get(0)?,
            vendor_name: row.get(1)?,
            month: date_col(row, 2)?,
            monthly_accomplishment: row.get(3)?,
            monthly_capability: row.get(4)?,
        })
    })?;
    rows.collect()
}

// ── Targets ────────────────────────────────────────────────────────

/// Store `target` as the active target for its key, deactivating any
/// previous one. Returns the new row id.
pub fn set_target(conn: &Connection, target: &KpiTarget) -> Result<i64, rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE kpi_targets SET is_active = 0
         WHERE kpi_type = ?1 AND period_start = ?2 AND period_end = ?3 AND is_active = 1",
        params![
            target.kpi_type.key(),
            date_key(target.period_start),
            date_key(target.period_end)
        ],
    )?;
    tx.execute(
        "INSERT INTO kpi_targets
            (kpi_type, period_start, period_end, target_value, green_threshold, yellow_threshold)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            target.kpi_type.key(),
            date_key(target.period_start),
            date_key(target.period_end),
            target.target_value,
            target.green_threshold,
            target.yellow_threshold,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

const TARGET_COLUMNS: &str =
    "kpi_type, period_start, period_end, target_value, green_threshold, yellow_threshold";

fn target_from_row(row: &Row<'_>) -> Result<KpiTarget, rusqlite::Error> {
    Ok(KpiTarget {
        kpi_type: parsed::<KpiType>(row, 0)?,
        period_start: date_col(row, 1)?,
        period_end: date_col(row, 2)?,
        target_value: row.get(3)?,
        green_threshold: row.get(4)?,
        yellow_threshold: row.get(5)?,
    })
}

/// Active target for `kpi`: an exact period match, otherwise the covering
/// target with the latest start.
pub fn find_active_target(
    conn: &Connection,
    kpi: KpiType,
    period: &ReportingPeriod,
) -> Result<Option<KpiTarget>, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT {TARGET_COLUMNS} FROM kpi_targets
             WHERE kpi_type = ?1 AND is_active = 1
               AND period_start <= ?2 AND period_end >= ?3
             ORDER BY (period_start = ?2 AND period_end = ?3) DESC,
                      period_start DESC, period_end ASC
             LIMIT 1"
        ),
        params![kpi.key(), date_key(period.start), date_key(period.end)],
        target_from_row,
    )
    .optional()
}

pub fn list_targets(conn: &Connection, kpi: Option<KpiType>) -> Result<Vec<KpiTarget>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TARGET_COLUMNS} FROM kpi_targets
         WHERE is_active = 1 AND (?1 IS NULL OR kpi_type = ?1)
         ORDER BY kpi_type, period_start DESC"
    ))?;
    let rows = stmt.query_map(params![kpi.map(|k| k.key())], target_from_row)?;
    rows.collect()
}

// ── Snapshots ──────────────────────────────────────────────────────

/// Append all snapshots in one transaction. Returns their ids in order.
pub fn insert_snapshots(conn: &Connection, snapshots: &[KpiSnapshot]) -> Result<Vec<i64>, rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;
    let mut ids = Vec::with_capacity(snapshots.len());
    {
        let mut stmt = tx.prepare(
            "INSERT INTO kpi_snapshots (
                kpi_type, period_start, period_end, value, target_value,
                numerator, denominator, sample_size, calculated_at, calculated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for s in snapshots {
            stmt.execute(params![
                s.kpi_type.key(),
                date_key(s.period_start),
                date_key(s.period_end),
                s.value,
                s.target_value,
                s.numerator,
                s.denominator,
                s.sample_size as i64,
                format_instant(&s.calculated_at),
                s.calculated_by,
            ])?;
            ids.push(tx.last_insert_rowid());
        }
    }
    tx.commit()?;
    Ok(ids)
}

/// Snapshots for `kpi`, newest period first, then newest calculation.
pub fn list_snapshots(
    conn: &Connection,
    kpi: KpiType,
    limit: usize,
) -> Result<Vec<KpiSnapshot>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, kpi_type, period_start, period_end, value, target_value,
                numerator, denominator, sample_size, calculated_at, calculated_by
         FROM kpi_snapshots
         WHERE kpi_type = ?1
         ORDER BY period_end DESC, calculated_at DESC, id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![kpi.key(), limit as i64], |row| {
        let calculated_at: String = row.get(9)?;
        Ok(KpiSnapshot {
            id: Some(row.get(0)?),
            kpi_type: parsed::<KpiType>(row, 1)?,
            period_start: date_col(row, 2)?,
            period_end: date_col(row, 3)?,
            value: row.get(4)?,
            target_value: row.get(5)?,
            numerator: row.get(6)?,
            denominator: row.get(7)?,
            sample_size: row.get::<_, i64>(8)?.max(0) as u64,
            calculated_at: parse_instant(&calculated_at).map_err(|e| conversion_error(9, e))?,
            calculated_by: row.get(10)?,
        })
    })?;
    rows.collect()
}

// ── Notification Log ───────────────────────────────────────────────

pub fn notification_sent_exists(
    conn: &Connection,
    notification_type: NotificationType,
    date: NaiveDate,
    recipient: &str,
) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM notification_log
            WHERE notification_type = ?1 AND notification_date = ?2
              AND recipient = ?3 AND status = 'SENT')",
        params![notification_type.as_str(), date_key(date), recipient],
        |row| row.get(0),
    )
}

/// Append a log entry. A `SENT` entry colliding with an existing one for the
/// same type, date and recipient is dropped and reported as `false`.
pub fn insert_notification(conn: &Connection, entry: &NotificationLogEntry) -> Result<bool, rusqlite::Error> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO notification_log (
            notification_type, notification_date, recipient, status, content, error, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.notification_type.as_str(),
            date_key(entry.notification_date),
            entry.recipient,
            entry.status.as_str(),
            entry.content,
            entry.error,
            format_instant(&entry.created_at),
        ],
    )?;
    Ok(inserted == 1)
}

/// Most recent entries first.
pub fn list_notifications(conn: &Connection, limit: usize) -> Result<Vec<NotificationLogEntry>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, notification_type, notification_date, recipient, status, content, error, created_at
         FROM notification_log
         ORDER BY id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
        let created_at: String = row.get(7)?;
        Ok(NotificationLogEntry {
            id: Some(row.get(0)?),
            notification_type: parsed(row, 1)?,
            notification_date: date_col(row, 2)?,
            recipient: row.get(3)?,
            status: parsed(row, 4)?,
            content: row.get(5)?,
            error: row.get(6)?,
            created_at: parse_instant(&created_at).map_err(|e| conversion_error(7, e))?,
        })
    })?;
    rows.collect()
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationStatus;
    use crate::query::filter::DateField;
    use crate::storage::Database;
    use chrono::{TimeZone, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                set_config(conn, "default_recipient", "ops@example.com")?;
                let val = get_config(conn, "default_recipient")?;
                assert_eq!(val, Some("ops@example.com".to_string()));

                let missing = get_config(conn, "nonexistent")?;
                assert_eq!(missing, None);
                assert_eq!(list_config(conn)?.len(), 1);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_work_order_round_trip_and_filter() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let mut wo = WorkOrder::new("WO-1", WorkOrderStatus::ForAudit);
                wo.date_received = Some(d(2024, 1, 3));
                wo.date_audited = Some(d(2024, 1, 20));
                wo.labor_hours = Some(40.0);
                wo.is_delayed = true;
                wo.delay_days = 4;
                upsert_work_order(conn, &wo)?;
                upsert_work_order(conn, &WorkOrder::new("WO-2", WorkOrderStatus::Paid))?;

                assert_eq!(get_work_order(conn, "WO-1")?, Some(wo.clone()));

                let filter = WorkOrderFilter::new()
                    .between(DateField::Received, d(2024, 1, 1), d(2024, 1, 31))
                    .status_in(&[WorkOrderStatus::ForAudit]);
                let rows = query_work_orders(conn, &filter)?;
                assert_eq!(rows, vec![wo]);
                assert_eq!(count_work_orders(conn, &WorkOrderFilter::new())?, 2);
                assert_eq!(
                    sum_amount(conn, &WorkOrderFilter::new(), AmountField::LaborHours)?,
                    40.0
                );
                assert_eq!(
                    sum_amount(conn, &WorkOrderFilter::new(), AmountField::BilledCost)?,
                    0.0
                );
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_vendor_productivity_upsert() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let mut row = VendorProductivity {
                    vendor_id: "V1".into(),
                    vendor_name: "Alpha".into(),
                    month: d(2024, 1, 1),
                    monthly_accomplishment: 10.0,
                    monthly_capability: 20.0,
                };
                upsert_vendor_productivity(conn, &row)?;
                row.monthly_accomplishment = 15.0;
                upsert_vendor_productivity(conn, &row)?;

                let rows = vendor_productivity_for_month(conn, d(2024, 1, 1))?;
                assert_eq!(rows, vec![row]);
                assert!(vendor_productivity_for_month(conn, d(2024, 2, 1))?.is_empty());
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_target_deactivates_previous() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let jan = ReportingPeriod::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
                let year = KpiTarget::new(KpiType::QualityIndex, d(2024, 1, 1), d(2024, 12, 31), 90.0);
                set_target(conn, &year)?;
                assert_eq!(find_active_target(conn, KpiType::QualityIndex, &jan)?, Some(year.clone()));

                let month = KpiTarget::new(KpiType::QualityIndex, d(2024, 1, 1), d(2024, 1, 31), 80.0);
                set_target(conn, &month)?;
                let replaced = month.clone().with_thresholds(Some(85.0), None);
                set_target(conn, &replaced)?;

                assert_eq!(find_active_target(conn, KpiType::QualityIndex, &jan)?, Some(replaced));
                assert_eq!(list_targets(conn, Some(KpiType::QualityIndex))?.len(), 2);
                assert!(list_targets(conn, Some(KpiType::Ccti))?.is_empty());

                let total: i64 = conn.query_row("SELECT COUNT(*) FROM kpi_targets", [], |r| r.get(0))?;
                assert_eq!(total, 3);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_ordering() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let base = KpiSnapshot {
                    id: None,
                    kpi_type: KpiType::Ccti,
                    period_start: d(2024, 1, 1),
                    period_end: d(2024, 1, 31),
                    value: 1.0333,
                    target_value: Some(1.0),
                    numerator: Some(1.0333),
                    denominator: Some(1.0),
                    sample_size: 1,
                    calculated_at: Utc.timestamp_opt(1_706_000_000, 123_456_000).unwrap(),
                    calculated_by: "test".into(),
                };
                let mut feb = base.clone();
                feb.period_start = d(2024, 2, 1);
                feb.period_end = d(2024, 2, 29);
                let mut recalculated = base.clone();
                recalculated.value = 1.1;
                recalculated.calculated_at = Utc.timestamp_opt(1_706_000_060, 0).unwrap();

                let ids = insert_snapshots(conn, &[base.clone(), feb.clone(), recalculated.clone()])?;
                assert_eq!(ids.len(), 3);

                let listed = list_snapshots(conn, KpiType::Ccti, 10)?;
                let values: Vec<f64> = listed.iter().map(|s| s.value).collect();
                assert_eq!(listed[0].period_end, d(2024, 2, 29));
                assert_eq!(values[1..], [1.1, 1.0333]);
                assert_eq!(listed[2].calculated_at, base.calculated_at);
                assert_eq!(listed[2].id, Some(ids[0]));
                assert!(list_snapshots(conn, KpiType::Prdi, 10)?.is_empty());
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_notification_log_rejects_duplicate_sent() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let entry = NotificationLogEntry {
                    id: None,
                    notification_type: NotificationType::KpiDaily,
                    notification_date: d(2024, 3, 5),
                    recipient: "ops@example.com".into(),
                    status: NotificationStatus::Failed,
                    content: String::new(),
                    error: Some("timeout".into()),
                    created_at: Utc.timestamp_opt(1_709_600_000, 0).unwrap(),
                };
                assert!(insert_notification(conn, &entry)?);
                assert!(insert_notification(conn, &entry)?);
                assert!(!notification_sent_exists(conn, NotificationType::KpiDaily, d(2024, 3, 5), "ops@example.com")?);

                let sent = NotificationLogEntry {
                    status: NotificationStatus::Sent,
                    error: None,
                    ..entry
                };
                assert!(insert_notification(conn, &sent)?);
                assert!(!insert_notification(conn, &sent)?);
                assert!(notification_sent_exists(conn, NotificationType::KpiDaily, d(2024, 3, 5), "ops@example.com")?);

                let listed = list_notifications(conn, 10)?;
                assert_eq!(listed.len(), 3);
                assert_eq!(listed[0].status, NotificationStatus::Sent);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }
}

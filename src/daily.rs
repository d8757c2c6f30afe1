//! The once-a-day KPI notification run.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::kpi::{calculate_all, KpiType};
use crate::notify::render::render;
use crate::notify::{
    record_outcome, should_send, Notification, NotificationLog, NotificationSink, NotificationStatus,
    NotificationType,
};
use crate::query::period::ReportingPeriod;
use crate::snapshot::KpiSnapshot;
use crate::source::{RecordSource, SnapshotSink, TargetSource};
use crate::status::{KpiTarget, OverallStatus, Scorecard};

pub const ALREADY_SENT: &str = "notification already sent today";
pub const SENT: &str = "notification sent successfully";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRunOutcome {
    pub success: bool,
    /// Set once the indicators were classified.
    pub status: Option<OverallStatus>,
    pub message: String,
    pub recipient: String,
    pub date: NaiveDate,
}

impl DailyRunOutcome {
    /// The run stopped at the gate because today's notification already went out.
    pub fn is_suppressed(&self) -> bool {
        !self.success && self.status.is_none() && self.message == ALREADY_SENT
    }
}

struct Prepared {
    scorecard: Scorecard,
    notification: Notification,
}

fn prepare<S>(
    store: &S,
    clock: &dyn Clock,
    config: &EngineConfig,
    recipient: &str,
) -> Result<Prepared>
where
    S: RecordSource + TargetSource + SnapshotSink + ?Sized,
{
    let today = clock.today();
    let period = ReportingPeriod::month_of(today);
    let report = calculate_all(store, &period, &config.kpi_config())?;

    let mut targets: BTreeMap<KpiType, KpiTarget> = BTreeMap::new();
    for kpi in report.results.keys() {
        if let Some(target) = store.active_target(*kpi, &period)? {
            targets.insert(*kpi, target);
        }
    }

    if config.persist_daily_snapshots {
        let snapshots =
            KpiSnapshot::from_report(&report, clock, &config.calculated_by, |k| targets.get(&k).cloned());
        let ids = store.append_snapshots(&snapshots)?;
        log::info!("Stored {} snapshots for {}", ids.len(), period);
    }

    let issues = store.delayed_work_orders(config.issues_limit)?;
    let scorecard = Scorecard::build(&report, |k| targets.get(&k).cloned());
    let notification = render(NotificationType::KpiDaily, recipient, today, &scorecard, &issues);
    Ok(Prepared {
        scorecard,
        notification,
    })
}

/// Calculate this month's indicators and deliver them to `recipient` (or the
/// configured default), at most once per recipient per day.
///
/// Calculation and delivery failures are logged as `FAILED` entries and
/// reported through the outcome; only notification-log failures are returned
/// as errors.
pub fn run_daily_report<S>(
    store: &S,
    clock: &dyn Clock,
    sink: &dyn NotificationSink,
    config: &EngineConfig,
    recipient: Option<&str>,
) -> Result<DailyRunOutcome>
where
    S: RecordSource + TargetSource + SnapshotSink + NotificationLog + ?Sized,
{
    let recipient = recipient.unwrap_or(&config.default_recipient);
    let today = clock.today();
    let kind = NotificationType::KpiDaily;
    let outcome = |success: bool, status: Option<OverallStatus>, message: String| DailyRunOutcome {
        success,
        status,
        message,
        recipient: recipient.to_string(),
        date: today,
    };

    if !should_send(store, kind, recipient, today)? {
        log::warn!("{kind} for {recipient} on {today} skipped: {ALREADY_SENT}");
        return Ok(outcome(false, None, ALREADY_SENT.to_string()));
    }

    let prepared = match prepare(store, clock, config, recipient) {
        Ok(p) => p,
        Err(e) => {
            let message = e.to_string();
            log::warn!("{kind} for {recipient} failed: {message}");
            record_outcome(store, clock, kind, recipient, NotificationStatus::Failed, "", Some(&message))?;
            return Ok(outcome(false, None, message));
        }
    };

    let overall = prepared.scorecard.overall;
    match sink.deliver(&prepared.notification) {
        Ok(()) => {
            record_outcome(
                store,
                clock,
                kind,
                recipient,
                NotificationStatus::Sent,
                &prepared.notification.body,
                None,
            )?;
            log::info!("{kind} sent to {recipient}: {}", prepared.notification.subject);
            Ok(outcome(true, Some(overall), SENT.to_string()))
        }
        Err(e) => {
            let message = e.to_string();
            log::warn!("{kind} delivery to {recipient} failed: {message}");
            record_outcome(
                store,
                clock,
                kind,
                recipient,
                NotificationStatus::Failed,
                &prepared.notification.body,
                Some(&message),
            )?;
            Ok(outcome(false, Some(overall), message))
        }
    }
}

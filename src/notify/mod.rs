pub mod render;
pub mod sink;

pub use sink::{LogSink, NotificationSink, OutboxSink};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{stored_instant, Clock};
use crate::error::{Error, Result};

/// Logged content beyond this many characters is cut off.
pub const MAX_LOGGED_CONTENT: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "KPI_DAILY")]
    KpiDaily,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::KpiDaily => "KPI_DAILY",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "KPI_DAILY" => Ok(NotificationType::KpiDaily),
            other => Err(Error::DataSource(format!("unknown notification type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SENT" => Ok(NotificationStatus::Sent),
            "FAILED" => Ok(NotificationStatus::Failed),
            other => Err(Error::DataSource(format!("unknown notification status: {other}"))),
        }
    }
}

/// One delivery attempt. Entries are never updated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub id: Option<i64>,
    pub notification_type: NotificationType,
    pub notification_date: NaiveDate,
    pub recipient: String,
    pub status: NotificationStatus,
    pub content: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A rendered notification ready for a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub recipient: String,
    pub date: NaiveDate,
    pub subject: String,
    pub body: String,
}

/// Append-only record of delivery attempts.
///
/// At most one [`NotificationStatus::Sent`] entry may exist per
/// `(type, date, recipient)`. Implementations enforce this on append and
/// report a colliding `Sent` append as `Ok(false)`.
pub trait NotificationLog {
    fn sent_exists(
        &self,
        notification_type: NotificationType,
        date: NaiveDate,
        recipient: &str,
    ) -> Result<bool>;

    /// Returns `false` when the entry was rejected as a duplicate `Sent`.
    fn append_entry(&self, entry: &NotificationLogEntry) -> Result<bool>;
}

/// Whether a notification may still go out for `recipient` on `date`.
///
/// This check and the later [`record_outcome`] are not atomic; two callers
/// can both pass the gate. The log itself still refuses the second `Sent`.
pub fn should_send<L: NotificationLog + ?Sized>(
    log: &L,
    notification_type: NotificationType,
    recipient: &str,
    date: NaiveDate,
) -> Result<bool> {
    Ok(!log.sent_exists(notification_type, date, recipient)?)
}

/// Append an entry dated `clock.today()`. Content is cut to
/// [`MAX_LOGGED_CONTENT`] characters.
pub fn record_outcome<L: NotificationLog + ?Sized>(
    log: &L,
    clock: &dyn Clock,
    notification_type: NotificationType,
    recipient: &str,
    status: NotificationStatus,
    content: &str,
    error: Option<&str>,
) -> Result<bool> {
    let entry = NotificationLogEntry {
        id: None,
        notification_type,
        notification_date: clock.today(),
        recipient: recipient.to_string(),
        status,
        content: truncate_chars(content, MAX_LOGGED_CONTENT),
        error: error.map(str::to_string),
        created_at: stored_instant(clock),
    };
    let appended = log.append_entry(&entry)?;
    if !appended {
        log::warn!(
            "{} already recorded as sent to {} on {}",
            notification_type,
            recipient,
            entry.notification_date
        );
    }
    Ok(appended)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

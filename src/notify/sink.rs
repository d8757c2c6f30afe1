use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::notify::Notification;

/// Destination for rendered notifications.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Writes the notification through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        log::info!(
            "{} to {}: {}\n{}",
            notification.notification_type,
            notification.recipient,
            notification.subject,
            notification.body
        );
        Ok(())
    }
}

/// Writes each notification as a JSON file in a directory, for pickup by an
/// external mailer.
#[derive(Debug, Clone)]
pub struct OutboxSink {
    dir: PathBuf,
}

impl OutboxSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(notification: &Notification) -> String {
        let recipient: String = notification
            .recipient
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        format!(
            "{}_{}_{}.json",
            notification.notification_type.as_str().to_lowercase(),
            notification.date.format("%Y%m%d"),
            recipient
        )
    }
}

impl NotificationSink for OutboxSink {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Delivery(format!("create {}: {e}", self.dir.display())))?;
        let path = self.dir.join(Self::file_name(notification));
        let json = serde_json::to_string_pretty(notification)
            .map_err(|e| Error::Delivery(e.to_string()))?;
        std::fs::write(&path, json)
            .map_err(|e| Error::Delivery(format!("write {}: {e}", path.display())))?;
        log::info!("Queued {} in {}", notification.subject, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationType;
    use chrono::NaiveDate;

    fn notification() -> Notification {
        Notification {
            notification_type: NotificationType::KpiDaily,
            recipient: "ops@example.com".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            subject: "Daily KPI Report".into(),
            body: "body".into(),
        }
    }

    #[test]
    fn test_outbox_writes_json_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = OutboxSink::new(tmp.path().join("outbox"));
        sink.deliver(&notification()).unwrap();

        let path = sink.dir().join("kpi_daily_20240305_ops_example.com.json");
        let text = std::fs::read_to_string(path).unwrap();
        let back: Notification = serde_json::from_str(&text).unwrap();
        assert_eq!(back, notification());
    }

    #[test]
    fn test_outbox_failure_is_delivery_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let sink = OutboxSink::new(&blocker);
        let err = sink.deliver(&notification()).unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
    }

    #[test]
    fn test_log_sink_accepts() {
        assert!(LogSink.deliver(&notification()).is_ok());
    }
}

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};

/// Source of "now" for calculations, snapshots and the notification gate.
pub trait Clock: Send + Sync {
    /// The current calendar date in the reporting timezone.
    fn today(&self) -> NaiveDate;

    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock: local calendar date, UTC timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { today, now }
    }

    /// Pin to midnight UTC of `today`.
    pub fn on(today: NaiveDate) -> Self {
        let now = today.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        Self { today, now }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Timestamps are persisted with microsecond precision.
pub(crate) fn stored_instant(clock: &dyn Clock) -> DateTime<Utc> {
    clock.now().trunc_subsecs(6)
}

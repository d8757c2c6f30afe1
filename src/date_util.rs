use chrono::{Datelike, Duration, NaiveDate};

/// Get the last day of a given month.
///
/// `month` must be in `1..=12`; out-of-range months clamp to December.
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|d| d - Duration::days(1))
        .unwrap_or(NaiveDate::MAX)
}

/// First day of the month containing `d`.
pub fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

/// Inclusive bounds of the calendar month containing `d`.
pub fn month_bounds(d: NaiveDate) -> (NaiveDate, NaiveDate) {
    (first_of_month(d), last_day_of_month(d.year(), d.month()))
}

/// Get the quarter (1-4) for a given date.
pub fn quarter_of(d: NaiveDate) -> u8 {
    ((d.month() - 1) / 3 + 1) as u8
}

/// Whole days from `from` to `to` (negative when `to` precedes `from`).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Parse a `YYYY-MM-DD` date key.
pub fn parse_date_key(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Format a date as a `YYYY-MM-DD` key.
pub fn date_key(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2025, 1),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
        assert_eq!(
            last_day_of_month(2025, 2),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        ); // Leap year
        assert_eq!(
            last_day_of_month(2025, 12),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_month_bounds() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let (s, e) = month_bounds(d);
        assert_eq!(s, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(e, NaiveDate::from_ymd_opt(2026, 10, 31).unwrap());
    }

    #[test]
    fn test_quarter_of() {
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()), 1);
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()), 1);
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()), 2);
        assert_eq!(
            quarter_of(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()),
            4
        );
    }

    #[test]
    fn test_days_between_can_be_negative() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(days_between(b, a), 30);
        assert_eq!(days_between(a, b), -30);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.033_333, 4), 1.0333);
        assert_eq!(round_to(59.996, 2), 60.0);
        assert_eq!(round_to(0.0, 2), 0.0);
    }

    #[test]
    fn test_date_key_round_trip() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(date_key(d), "2025-03-09");
        assert_eq!(parse_date_key("2025-03-09"), Some(d));
        assert_eq!(parse_date_key("not a date"), None);
    }
}

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::date_util::{last_day_of_month, parse_date_key, quarter_of};
use crate::error::{Error, Result};

static RE_HALF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-H([12])$").unwrap());
static RE_QUARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());
static RE_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static RE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})\.\.(\d{4}-\d{2}-\d{2})$").unwrap());

/// An inclusive date window that indicators are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidPeriod(format!("{start} is after {end}")));
        }
        Ok(Self { start, end })
    }

    /// The calendar month containing `d`.
    pub fn month_of(d: NaiveDate) -> Self {
        let (start, end) = crate::date_util::month_bounds(d);
        Self { start, end }
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }
}

impl std::fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A named period shorthand, resolved against a reference date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Year(i32),
    Half(i32, u8),
    Quarter(i32, u8),
    Month(i32, u8),
    Week(i32, u8),
    Rolling(u32, NaiveDate),
    Range(NaiveDate, NaiveDate),
    YearToDate(i32),
    HalfToDate(i32, u8),
    QuarterToDate(i32, u8),
    MonthToDate(i32, u8),
    WeekToDate(i32, u8),
}

impl Period {
    /// Parse a period string relative to `today`.
    ///
    /// Supported formats:
    /// - `2025`: year
    /// - `2025-H1`: half
    /// - `2025-Q1`: quarter
    /// - `2025-01`: month
    /// - `2025-W05`: ISO week
    /// - `2025-01-01..2025-01-31`: explicit inclusive range
    /// - `30d`: rolling last N days ending today
    /// - `ytd`, `htd`, `qtd`, `mtd`, `wtd`: to-date periods
    /// - `2025-ytd`: year to date for a given year
    pub fn parse(s: &str, today: NaiveDate) -> Result<Self> {
        let s = s.trim();

        match s.to_lowercase().as_str() {
            "ytd" => return Ok(Period::YearToDate(today.year())),
            "htd" => {
                let half = if today.month() <= 6 { 1 } else { 2 };
                return Ok(Period::HalfToDate(today.year(), half));
            }
            "qtd" => return Ok(Period::QuarterToDate(today.year(), quarter_of(today))),
            "mtd" => return Ok(Period::MonthToDate(today.year(), today.month() as u8)),
            "wtd" => {
                let iw = today.iso_week();
                return Ok(Period::WeekToDate(iw.year(), iw.week() as u8));
            }
            _ => {}
        }

        // Rolling: "30d", "7d", etc.
        if let Some(n) = s.strip_suffix(['d', 'D']) {
            if let Ok(n) = n.parse::<u32>() {
                if n == 0 {
                    return Err(Error::PeriodParse(format!("empty rolling window: {s}")));
                }
                return Ok(Period::Rolling(n, today));
            }
        }

        if let Some(rest) = s.strip_suffix("-ytd") {
            let year: i32 = rest
                .parse()
                .map_err(|_| Error::PeriodParse(format!("invalid year: {s}")))?;
            return Ok(Period::YearToDate(year));
        }

        if s.len() == 4 {
            if let Ok(year) = s.parse::<i32>() {
                return Ok(Period::Year(year));
            }
        }

        if let Some(caps) = RE_RANGE.captures(s) {
            let start = parse_date_key(&caps[1])
                .ok_or_else(|| Error::PeriodParse(format!("invalid date: {}", &caps[1])))?;
            let end = parse_date_key(&caps[2])
                .ok_or_else(|| Error::PeriodParse(format!("invalid date: {}", &caps[2])))?;
            return Ok(Period::Range(start, end));
        }

        if let Some(caps) = RE_HALF.captures(s) {
            return Ok(Period::Half(parse_num(&caps[1], s)?, parse_num(&caps[2], s)?));
        }

        if let Some(caps) = RE_QUARTER.captures(s) {
            return Ok(Period::Quarter(parse_num(&caps[1], s)?, parse_num(&caps[2], s)?));
        }

        if let Some(caps) = RE_WEEK.captures(s) {
            let year: i32 = parse_num(&caps[1], s)?;
            let week: u8 = parse_num(&caps[2], s)?;
            if (1..=53).contains(&week) {
                return Ok(Period::Week(year, week));
            }
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let year: i32 = parse_num(&caps[1], s)?;
            let month: u8 = parse_num(&caps[2], s)?;
            if (1..=12).contains(&month) {
                return Ok(Period::Month(year, month));
            }
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    /// Convert to a canonical key string for display/lookup.
    pub fn to_key(&self) -> String {
        match self {
            Period::Year(y) => format!("{y}"),
            Period::Half(y, h) => format!("{y}-H{h}"),
            Period::Quarter(y, q) => format!("{y}-Q{q}"),
            Period::Month(y, m) => format!("{y}-{m:02}"),
            Period::Week(y, w) => format!("{y}-W{w:02}"),
            Period::Rolling(n, _) => format!("{n}d"),
            Period::Range(s, e) => format!("{s}..{e}"),
            Period::YearToDate(y) => format!("{y}-ytd"),
            Period::HalfToDate(y, h) => format!("{y}-H{h}-td"),
            Period::QuarterToDate(y, q) => format!("{y}-Q{q}-td"),
            Period::MonthToDate(y, m) => format!("{y}-{m:02}-td"),
            Period::WeekToDate(y, w) => format!("{y}-W{w:02}-td"),
        }
    }

    /// Resolve to an inclusive reporting period. To-date periods end at `today`.
    pub fn resolve(&self, today: NaiveDate) -> Result<ReportingPeriod> {
        let invalid = || Error::PeriodParse(format!("no such period: {}", self.to_key()));
        let ymd = |y: i32, m: u32, d: u32| NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid);

        let (start, end) = match self {
            Period::Year(y) => (ymd(*y, 1, 1)?, ymd(*y, 12, 31)?),
            Period::Half(y, 1) => (ymd(*y, 1, 1)?, ymd(*y, 6, 30)?),
            Period::Half(y, _) => (ymd(*y, 7, 1)?, ymd(*y, 12, 31)?),
            Period::Quarter(y, q) => {
                let start_month = (*q as u32 - 1) * 3 + 1;
                (ymd(*y, start_month, 1)?, last_day_of_month(*y, *q as u32 * 3))
            }
            Period::Month(y, m) => (ymd(*y, *m as u32, 1)?, last_day_of_month(*y, *m as u32)),
            Period::Week(y, w) => {
                let start = NaiveDate::from_isoywd_opt(*y, *w as u32, Weekday::Mon)
                    .ok_or_else(invalid)?;
                (start, start + Duration::days(6))
            }
            Period::Rolling(n, as_of) => {
                let start = as_of
                    .checked_sub_signed(Duration::days(*n as i64 - 1))
                    .ok_or_else(invalid)?;
                (start, *as_of)
            }
            Period::Range(s, e) => (*s, *e),
            Period::YearToDate(y) => (ymd(*y, 1, 1)?, today),
            Period::HalfToDate(y, h) => {
                let start = if *h == 1 { ymd(*y, 1, 1)? } else { ymd(*y, 7, 1)? };
                (start, today)
            }
            Period::QuarterToDate(y, q) => (ymd(*y, (*q as u32 - 1) * 3 + 1, 1)?, today),
            Period::MonthToDate(y, m) => (ymd(*y, *m as u32, 1)?, today),
            Period::WeekToDate(y, w) => {
                let start = NaiveDate::from_isoywd_opt(*y, *w as u32, Weekday::Mon)
                    .ok_or_else(invalid)?;
                (start, today)
            }
        };
        ReportingPeriod::new(start, end)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

fn parse_num<T: std::str::FromStr>(digits: &str, input: &str) -> Result<T> {
    digits
        .parse()
        .map_err(|_| Error::PeriodParse(format!("invalid number in period: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2026, 10, 16)
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(Period::parse("2025", today()).unwrap(), Period::Year(2025));
    }

    #[test]
    fn test_parse_half_and_quarter() {
        assert_eq!(Period::parse("2025-H2", today()).unwrap(), Period::Half(2025, 2));
        assert_eq!(Period::parse("2025-Q4", today()).unwrap(), Period::Quarter(2025, 4));
    }

    #[test]
    fn test_parse_month_and_week() {
        assert_eq!(Period::parse("2025-01", today()).unwrap(), Period::Month(2025, 1));
        assert_eq!(Period::parse("2025-W05", today()).unwrap(), Period::Week(2025, 5));
        assert_eq!(Period::parse("2025-W1", today()).unwrap(), Period::Week(2025, 1));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(
            Period::parse("2024-01-01..2024-01-31", today()).unwrap(),
            Period::Range(d(2024, 1, 1), d(2024, 1, 31))
        );
    }

    #[test]
    fn test_parse_rolling_uses_reference_date() {
        let p = Period::parse("30d", today()).unwrap();
        assert_eq!(p, Period::Rolling(30, today()));
        let r = p.resolve(today()).unwrap();
        assert_eq!(r.start, d(2026, 9, 17));
        assert_eq!(r.end, today());
    }

    #[test]
    fn test_parse_to_date() {
        assert_eq!(Period::parse("ytd", today()).unwrap(), Period::YearToDate(2026));
        assert_eq!(Period::parse("qtd", today()).unwrap(), Period::QuarterToDate(2026, 4));
        assert_eq!(Period::parse("mtd", today()).unwrap(), Period::MonthToDate(2026, 10));
        assert_eq!(Period::parse("htd", today()).unwrap(), Period::HalfToDate(2026, 2));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Period::parse("garbage", today()).is_err());
        assert!(Period::parse("2025-Q5", today()).is_err());
        assert!(Period::parse("2025-13", today()).is_err());
        assert!(Period::parse("0d", today()).is_err());
    }

    #[test]
    fn test_resolve_month() {
        let r = Period::Month(2024, 2).resolve(today()).unwrap();
        assert_eq!(r.start, d(2024, 2, 1));
        assert_eq!(r.end, d(2024, 2, 29));
    }

    #[test]
    fn test_resolve_quarter() {
        let r = Period::Quarter(2025, 2).resolve(today()).unwrap();
        assert_eq!(r.start, d(2025, 4, 1));
        assert_eq!(r.end, d(2025, 6, 30));
    }

    #[test]
    fn test_resolve_week() {
        let r = Period::Week(2025, 1).resolve(today()).unwrap();
        assert_eq!(r.start.weekday(), Weekday::Mon);
        assert_eq!((r.end - r.start).num_days(), 6);
    }

    #[test]
    fn test_resolve_inverted_range_is_error() {
        let p = Period::Range(d(2024, 2, 1), d(2024, 1, 1));
        assert!(matches!(p.resolve(today()), Err(Error::InvalidPeriod(_))));
    }

    #[test]
    fn test_resolve_rolling_past_calendar_start_is_error() {
        let p = Period::parse("99999999d", today()).unwrap();
        assert!(matches!(p.resolve(today()), Err(Error::PeriodParse(_))));
    }

    #[test]
    fn test_to_key() {
        assert_eq!(Period::Quarter(2025, 1).to_key(), "2025-Q1");
        assert_eq!(Period::Month(2025, 1).to_key(), "2025-01");
        assert_eq!(Period::Week(2025, 5).to_key(), "2025-W05");
        assert_eq!(Period::Range(d(2025, 1, 1), d(2025, 1, 2)).to_key(), "2025-01-01..2025-01-02");
    }

    #[test]
    fn test_reporting_period_month_of() {
        let p = ReportingPeriod::month_of(today());
        assert_eq!(p.start, d(2026, 10, 1));
        assert_eq!(p.end, d(2026, 10, 31));
        assert!(p.contains(today()));
        assert!(!p.contains(d(2026, 11, 1)));
    }
}

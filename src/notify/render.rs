//! Plain-text rendering of the daily report.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::notify::{Notification, NotificationType};
use crate::source::WorkOrder;
use crate::status::{KpiStatus, Scorecard};

pub fn subject(date: NaiveDate, scorecard: &Scorecard) -> String {
    format!(
        "Daily KPI Report - {} - {}",
        date.format("%B %d, %Y"),
        scorecard.overall.headline()
    )
}

fn status_marker(status: KpiStatus) -> &'static str {
    match status {
        KpiStatus::Good => "[OK]",
        KpiStatus::Warning => "[!!]",
        KpiStatus::Bad => "[XX]",
        KpiStatus::Neutral => "[--]",
    }
}

pub fn body(scorecard: &Scorecard, issues: &[WorkOrder]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "KPI summary for {}", scorecard.period);
    let _ = writeln!(out, "Overall status: {}", scorecard.overall.headline());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {:<4} {:<20} {:>12} {:>12} {:>8}",
        "", "Indicator", "Value", "Target", "Sample"
    );
    for entry in &scorecard.entries {
        let unit = entry.kpi_type.unit();
        let places = entry.kpi_type.precision() as usize;
        let target = entry
            .target
            .as_ref()
            .map_or_else(|| "-".to_string(), |t| format!("{:.places$}", t.target_value));
        let _ = writeln!(
            out,
            "  {:<4} {:<20} {:>12} {:>12} {:>8}",
            status_marker(entry.status),
            entry.kpi_type.label(),
            format!("{:.places$}{unit}", entry.value),
            target,
            entry.sample_size
        );
    }

    let _ = writeln!(out);
    if issues.is_empty() {
        let _ = writeln!(out, "No delayed work orders.");
    } else {
        let _ = writeln!(out, "Delayed work orders ({}):", issues.len());
        for wo in issues {
            let _ = writeln!(
                out,
                "  {:<16} {:<10} {:>5} days  {}",
                wo.wo_no,
                wo.status.as_str(),
                wo.delay_days,
                wo.description.as_deref().unwrap_or("")
            );
        }
    }
    out
}

pub fn render(
    notification_type: NotificationType,
    recipient: &str,
    date: NaiveDate,
    scorecard: &Scorecard,
    issues: &[WorkOrder],
) -> Notification {
    Notification {
        notification_type,
        recipient: recipient.to_string(),
        date,
        subject: subject(date, scorecard),
        body: body(scorecard, issues),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::{KpiReport, KpiResult, KpiType};
    use crate::query::period::ReportingPeriod;
    use crate::source::WorkOrderStatus;
    use crate::status::KpiTarget;
    use std::collections::BTreeMap;

    fn card() -> Scorecard {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let mut results = BTreeMap::new();
        let mut r = KpiResult::empty();
        r.value = 40.0;
        r.sample_size = 10;
        results.insert(KpiType::QualityIndex, r.clone());
        results.insert(KpiType::PcaConversion, r);
        let report = KpiReport {
            period: ReportingPeriod::month_of(d),
            results,
        };
        Scorecard::build(&report, |kpi| Some(KpiTarget::new(kpi, d, d, 95.0)))
    }

    #[test]
    fn test_subject_carries_date_and_headline() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(subject(d, &card()), "Daily KPI Report - March 05, 2024 - CRITICAL");
    }

    #[test]
    fn test_body_lists_indicators_and_issues() {
        let mut wo = WorkOrder::new("WO-77", WorkOrderStatus::NoCoc);
        wo.is_delayed = true;
        wo.delay_days = 12;
        let text = body(&card(), &[wo]);
        assert!(text.contains("Quality Index"));
        assert!(text.contains("40.00%"));
        assert!(text.contains("[XX]"));
        assert!(text.contains("Delayed work orders (1):"));
        assert!(text.contains("WO-77"));
    }

    #[test]
    fn test_body_without_issues() {
        let text = body(&card(), &[]);
        assert!(text.contains("No delayed work orders."));
    }
}

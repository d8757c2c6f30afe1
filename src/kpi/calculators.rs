//! The eight indicator calculators.
//!
//! Each calculator reads only the records its indicator needs and never
//! mutates the source. An empty filtered set yields [`KpiResult::empty`];
//! the only error path is a failing record source.

use chrono::NaiveDate;

use crate::date_util::{days_between, first_of_month, last_day_of_month, round_to};
use crate::error::Result;
use crate::kpi::spt::{spt_by_applied_load, spt_by_labor_hours};
use crate::kpi::types::{DetailRow, KpiConfig, KpiResult};
use crate::query::filter::{AmountField, DateField, WorkOrderFilter};
use crate::query::period::ReportingPeriod;
use crate::source::{RecordSource, WorkOrderStatus};

const COMPLETED: [WorkOrderStatus; 2] = [WorkOrderStatus::Audited, WorkOrderStatus::Paid];
const OPEN_CARRYOVER: [WorkOrderStatus; 2] = [WorkOrderStatus::New, WorkOrderStatus::ForAudit];

const CCTI_HOURS_WEIGHT: f64 = 0.30;
const CCTI_LOAD_WEIGHT: f64 = 0.70;

fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        round_to(numerator / denominator * 100.0, 2)
    } else {
        0.0
    }
}

fn mean_result(sum: f64, count: usize, places: u32, details: Vec<DetailRow>) -> KpiResult {
    if count == 0 {
        return KpiResult::empty();
    }
    KpiResult {
        value: round_to(sum / count as f64, places),
        sample_size: count as u64,
        numerator: Some(round_to(sum, places)),
        denominator: Some(count as f64),
        details,
    }
}

/// Customer Connection Timeliness Index.
///
/// Work orders energized in the period with awarding date, labor hours and
/// estimated cost present. Each contributes
/// `0.30 * d / SPT_hours(hours) + 0.70 * d / SPT_load(cost / 1000)` where `d`
/// is days from awarding to energization; the value is the mean component.
pub fn ccti<S: RecordSource + ?Sized>(source: &S, period: &ReportingPeriod) -> Result<KpiResult> {
    let filter = WorkOrderFilter::new()
        .between(DateField::Energized, period.start, period.end)
        .has_date(DateField::Awarding)
        .has_amount(AmountField::LaborHours)
        .has_amount(AmountField::EstimatedCost);
    let orders = source.work_orders(&filter)?;

    let mut sum = 0.0;
    let mut details = Vec::with_capacity(orders.len());
    for wo in &orders {
        let (Some(awarding), Some(energized), Some(hours), Some(cost)) = (
            wo.date_awarding,
            wo.date_energized,
            wo.labor_hours,
            wo.estimated_cost,
        ) else {
            continue;
        };
        let duration = days_between(awarding, energized);
        let spt_hours = spt_by_labor_hours(hours);
        let spt_load = spt_by_applied_load(cost / 1000.0);
        let d = duration as f64;
        let component = CCTI_HOURS_WEIGHT * d / spt_hours + CCTI_LOAD_WEIGHT * d / spt_load;
        sum += component;
        details.push(DetailRow::Timeliness {
            wo_no: wo.wo_no.clone(),
            duration_days: duration,
            spt_hours,
            spt_load,
            component: round_to(component, 4),
        });
    }

    let count = details.len();
    Ok(mean_result(sum, count, 4, details))
}

/// Share of the period's workload (carryover plus intake less cancellations)
/// that was audited or paid within the period.
pub fn pca_conversion<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
) -> Result<KpiResult> {
    let carryover = source.count_work_orders(
        &WorkOrderFilter::new()
            .before(DateField::Received, period.start)
            .status_in(&OPEN_CARRYOVER),
    )?;
    let received_in_period =
        WorkOrderFilter::new().between(DateField::Received, period.start, period.end);
    let received = source.count_work_orders(&received_in_period)?;
    let cancelled =
        source.count_work_orders(&received_in_period.status(WorkOrderStatus::Cancelled))?;
    let completed = source.count_work_orders(
        &WorkOrderFilter::new()
            .between(DateField::Audited, period.start, period.end)
            .status_in(&COMPLETED),
    )?;

    if carryover + received + completed == 0 {
        return Ok(KpiResult::empty());
    }

    let denominator = carryover as i64 + received as i64 - cancelled as i64;
    let value = if denominator > 0 {
        percentage(completed as f64, denominator as f64)
    } else {
        0.0
    };

    Ok(KpiResult {
        value,
        sample_size: denominator.max(0) as u64,
        numerator: Some(completed as f64),
        denominator: Some(denominator as f64),
        details: vec![
            DetailRow::breakdown("carryover", carryover as f64),
            DetailRow::breakdown("received", received as f64),
            DetailRow::breakdown("cancelled", cancelled as f64),
            DetailRow::breakdown("completed", completed as f64),
        ],
    })
}

/// Completion rate of the ageing backlog: work orders received in or before
/// the cutoff year that were audited or paid within the period.
pub fn ageing_completion<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
    cutoff_year: i32,
) -> Result<KpiResult> {
    let cutoff = last_day_of_month(cutoff_year, 12);
    let ageing = WorkOrderFilter::new().on_or_before(DateField::Received, cutoff);
    let total = source.count_work_orders(&ageing)?;
    if total == 0 {
        return Ok(KpiResult::empty());
    }
    let completed = source.count_work_orders(
        &ageing
            .between(DateField::Audited, period.start, period.end)
            .status_in(&COMPLETED),
    )?;

    Ok(KpiResult {
        value: percentage(completed as f64, total as f64),
        sample_size: total,
        numerator: Some(completed as f64),
        denominator: Some(total as f64),
        details: vec![
            DetailRow::breakdown("ageing_total", total as f64),
            DetailRow::breakdown("completed", completed as f64),
        ],
    })
}

/// Average days from awarding to audit for work orders audited in the period.
pub fn termination_apt<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
) -> Result<KpiResult> {
    let filter = WorkOrderFilter::new()
        .between(DateField::Audited, period.start, period.end)
        .has_date(DateField::Awarding);
    let orders = source.work_orders(&filter)?;

    let mut sum = 0.0;
    let mut details = Vec::with_capacity(orders.len());
    for wo in &orders {
        let (Some(awarding), Some(audited)) = (wo.date_awarding, wo.date_audited) else {
            continue;
        };
        let days = days_between(awarding, audited);
        sum += days as f64;
        details.push(DetailRow::ProcessingTime {
            wo_no: wo.wo_no.clone(),
            processing_days: days,
        });
    }

    let count = details.len();
    Ok(mean_result(sum, count, 2, details))
}

/// Project Resolution Duration Index: mean of energization-to-audit days
/// over `spt_days` for work orders audited in the period.
pub fn prdi<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
    spt_days: f64,
) -> Result<KpiResult> {
    let filter = WorkOrderFilter::new()
        .between(DateField::Audited, period.start, period.end)
        .has_date(DateField::Energized);
    let orders = source.work_orders(&filter)?;

    let mut sum = 0.0;
    let mut details = Vec::with_capacity(orders.len());
    for wo in &orders {
        let (Some(energized), Some(audited)) = (wo.date_energized, wo.date_audited) else {
            continue;
        };
        let duration = days_between(energized, audited);
        let component = duration as f64 / spt_days;
        sum += component;
        details.push(DetailRow::Resolution {
            wo_no: wo.wo_no.clone(),
            duration_days: duration,
            component: round_to(component, 4),
        });
    }

    let count = details.len();
    Ok(mean_result(sum, count, 4, details))
}

/// Paid billed amount as a share of paid, new (estimated) and audited
/// (billed) amounts across all work orders.
pub fn cost_settlement<S: RecordSource + ?Sized>(source: &S) -> Result<KpiResult> {
    let paid_filter = WorkOrderFilter::new().status(WorkOrderStatus::Paid);
    let new_filter = WorkOrderFilter::new().status(WorkOrderStatus::New);
    let audited_filter = WorkOrderFilter::new().status(WorkOrderStatus::Audited);

    let sample = source.count_work_orders(&WorkOrderFilter::new().status_in(&[
        WorkOrderStatus::Paid,
        WorkOrderStatus::New,
        WorkOrderStatus::Audited,
    ]))?;
    if sample == 0 {
        return Ok(KpiResult::empty());
    }

    let paid = source.sum_amount(&paid_filter, AmountField::BilledCost)?;
    let new = source.sum_amount(&new_filter, AmountField::EstimatedCost)?;
    let audited = source.sum_amount(&audited_filter, AmountField::BilledCost)?;
    let total = paid + new + audited;

    Ok(KpiResult {
        value: percentage(paid, total),
        sample_size: sample,
        numerator: Some(paid),
        denominator: Some(total),
        details: vec![
            DetailRow::breakdown("paid_billed", paid),
            DetailRow::breakdown("new_estimated", new),
            DetailRow::breakdown("audited_billed", audited),
        ],
    })
}

/// Share of work orders audited in the period that passed (audited or paid).
pub fn quality_index<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
) -> Result<KpiResult> {
    let audited = WorkOrderFilter::new().between(DateField::Audited, period.start, period.end);
    let total = source.count_work_orders(&audited)?;
    if total == 0 {
        return Ok(KpiResult::empty());
    }
    let passed = source.count_work_orders(&audited.status_in(&COMPLETED))?;

    Ok(KpiResult {
        value: percentage(passed as f64, total as f64),
        sample_size: total,
        numerator: Some(passed as f64),
        denominator: Some(total as f64),
        details: vec![
            DetailRow::breakdown("audited", total as f64),
            DetailRow::breakdown("passed", passed as f64),
        ],
    })
}

/// Vendor accomplishment over capability for the month containing the
/// period start, with per-vendor rows.
pub fn capability_utilization<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
) -> Result<KpiResult> {
    let month: NaiveDate = first_of_month(period.start);
    let rows = source.vendor_productivity(month)?;
    if rows.is_empty() {
        return Ok(KpiResult::empty());
    }

    let accomplishment: f64 = rows.iter().map(|r| r.monthly_accomplishment).sum();
    let capability: f64 = rows.iter().map(|r| r.monthly_capability).sum();
    let details = rows
        .iter()
        .map(|r| DetailRow::Vendor {
            vendor_id: r.vendor_id.clone(),
            vendor_name: r.vendor_name.clone(),
            accomplishment: r.monthly_accomplishment,
            capability: r.monthly_capability,
            utilization: percentage(r.monthly_accomplishment, r.monthly_capability),
        })
        .collect();

    Ok(KpiResult {
        value: percentage(accomplishment, capability),
        sample_size: rows.len() as u64,
        numerator: Some(accomplishment),
        denominator: Some(capability),
        details,
    })
}

/// Config-aware entry points shared by the aggregator.
pub(crate) fn ageing_completion_with<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
    config: &KpiConfig,
) -> Result<KpiResult> {
    ageing_completion(source, period, config.ageing_cutoff_year)
}

pub(crate) fn prdi_with<S: RecordSource + ?Sized>(
    source: &S,
    period: &ReportingPeriod,
    config: &KpiConfig,
) -> Result<KpiResult> {
    prdi(source, period, config.prdi_spt_days)
}

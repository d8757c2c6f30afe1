use chrono::NaiveDate;

use crate::date_util::date_key;
use crate::source::records::{WorkOrder, WorkOrderStatus};

/// Nullable date columns of a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Received,
    Awarding,
    Energized,
    CocReceived,
    ForAudit,
    Audited,
}

impl DateField {
    pub fn column(&self) -> &'static str {
        match self {
            DateField::Received => "date_received",
            DateField::Awarding => "date_awarding",
            DateField::Energized => "date_energized",
            DateField::CocReceived => "date_coc_received",
            DateField::ForAudit => "date_for_audit",
            DateField::Audited => "date_audited",
        }
    }

    pub fn get(&self, wo: &WorkOrder) -> Option<NaiveDate> {
        match self {
            DateField::Received => wo.date_received,
            DateField::Awarding => wo.date_awarding,
            DateField::Energized => wo.date_energized,
            DateField::CocReceived => wo.date_coc_received,
            DateField::ForAudit => wo.date_for_audit,
            DateField::Audited => wo.date_audited,
        }
    }
}

/// Nullable numeric columns of a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountField {
    LaborHours,
    EstimatedCost,
    BilledCost,
}

impl AmountField {
    pub fn column(&self) -> &'static str {
        match self {
            AmountField::LaborHours => "labor_hours",
            AmountField::EstimatedCost => "estimated_cost",
            AmountField::BilledCost => "billed_cost",
        }
    }

    pub fn get(&self, wo: &WorkOrder) -> Option<f64> {
        match self {
            AmountField::LaborHours => wo.labor_hours,
            AmountField::EstimatedCost => wo.estimated_cost,
            AmountField::BilledCost => wo.billed_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Between(DateField, NaiveDate, NaiveDate),
    Before(DateField, NaiveDate),
    OnOrBefore(DateField, NaiveDate),
    HasDate(DateField),
    HasAmount(AmountField),
    StatusIn(Vec<WorkOrderStatus>),
    Delayed,
}

impl Condition {
    fn matches(&self, wo: &WorkOrder) -> bool {
        match self {
            Condition::Between(f, start, end) => {
                f.get(wo).is_some_and(|d| d >= *start && d <= *end)
            }
            Condition::Before(f, date) => f.get(wo).is_some_and(|d| d < *date),
            Condition::OnOrBefore(f, date) => f.get(wo).is_some_and(|d| d <= *date),
            Condition::HasDate(f) => f.get(wo).is_some(),
            Condition::HasAmount(f) => f.get(wo).is_some(),
            Condition::StatusIn(statuses) => statuses.contains(&wo.status),
            Condition::Delayed => wo.is_delayed,
        }
    }
}

/// Conjunction of conditions over work orders.
///
/// The same filter evaluates in memory ([`WorkOrderFilter::matches`]) and as
/// a SQL `WHERE` clause ([`WorkOrderFilter::build_where`]). A date comparison
/// never matches a missing date, in either form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkOrderFilter {
    conditions: Vec<Condition>,
}

impl WorkOrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `field` within `[start, end]` inclusive.
    pub fn between(mut self, field: DateField, start: NaiveDate, end: NaiveDate) -> Self {
        self.conditions.push(Condition::Between(field, start, end));
        self
    }

    /// `field` strictly before `date`.
    pub fn before(mut self, field: DateField, date: NaiveDate) -> Self {
        self.conditions.push(Condition::Before(field, date));
        self
    }

    pub fn on_or_before(mut self, field: DateField, date: NaiveDate) -> Self {
        self.conditions.push(Condition::OnOrBefore(field, date));
        self
    }

    pub fn has_date(mut self, field: DateField) -> Self {
        self.conditions.push(Condition::HasDate(field));
        self
    }

    pub fn has_amount(mut self, field: AmountField) -> Self {
        self.conditions.push(Condition::HasAmount(field));
        self
    }

    pub fn status_in(mut self, statuses: &[WorkOrderStatus]) -> Self {
        self.conditions.push(Condition::StatusIn(statuses.to_vec()));
        self
    }

    pub fn status(self, status: WorkOrderStatus) -> Self {
        self.status_in(&[status])
    }

    pub fn delayed(mut self) -> Self {
        self.conditions.push(Condition::Delayed);
        self
    }

    pub fn matches(&self, wo: &WorkOrder) -> bool {
        self.conditions.iter().all(|c| c.matches(wo))
    }

    /// Build a `WHERE` clause (empty when unfiltered) and its positional parameters.
    pub fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut wheres = Vec::new();
        let mut param_idx = 1;

        for cond in &self.conditions {
            match cond {
                Condition::Between(f, start, end) => {
                    wheres.push(format!(
                        "{col} >= ?{param_idx} AND {col} <= ?{}",
                        param_idx + 1,
                        col = f.column()
                    ));
                    params.push(Box::new(date_key(*start)));
                    params.push(Box::new(date_key(*end)));
                    param_idx += 2;
                }
                Condition::Before(f, date) => {
                    wheres.push(format!("{} < ?{param_idx}", f.column()));
                    params.push(Box::new(date_key(*date)));
                    param_idx += 1;
                }
                Condition::OnOrBefore(f, date) => {
                    wheres.push(format!("{} <= ?{param_idx}", f.column()));
                    params.push(Box::new(date_key(*date)));
                    param_idx += 1;
                }
                Condition::HasDate(f) => wheres.push(format!("{} IS NOT NULL", f.column())),
                Condition::HasAmount(f) => wheres.push(format!("{} IS NOT NULL", f.column())),
                Condition::StatusIn(statuses) if statuses.is_empty() => {
                    wheres.push("0".to_string());
                }
                Condition::StatusIn(statuses) => {
                    let placeholders: Vec<String> = statuses
                        .iter()
                        .map(|st| {
                            params.push(Box::new(st.as_str()));
                            let p = format!("?{param_idx}");
                            param_idx += 1;
                            p
                        })
                        .collect();
                    wheres.push(format!("status IN ({})", placeholders.join(", ")));
                }
                Condition::Delayed => wheres.push("is_delayed = 1".to_string()),
            }
        }

        if wheres.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", wheres.join(" AND ")), params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_build_where_empty() {
        let (sql, params) = WorkOrderFilter::new().build_where();
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_where_numbers_params_in_order() {
        let filter = WorkOrderFilter::new()
            .between(DateField::Audited, d(2024, 1, 1), d(2024, 1, 31))
            .status_in(&[WorkOrderStatus::Audited, WorkOrderStatus::Paid])
            .has_date(DateField::Awarding)
            .before(DateField::Received, d(2024, 1, 1));
        let (sql, params) = filter.build_where();
        assert!(sql.contains("date_audited >= ?1 AND date_audited <= ?2"));
        assert!(sql.contains("status IN (?3, ?4)"));
        assert!(sql.contains("date_awarding IS NOT NULL"));
        assert!(sql.contains("date_received < ?5"));
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_matches_ignores_missing_dates() {
        let filter = WorkOrderFilter::new().between(DateField::Energized, d(2024, 1, 1), d(2024, 1, 31));
        let mut wo = WorkOrder::new("WO-1", WorkOrderStatus::New);
        assert!(!filter.matches(&wo));
        wo.date_energized = Some(d(2024, 1, 31));
        assert!(filter.matches(&wo));
        wo.date_energized = Some(d(2024, 2, 1));
        assert!(!filter.matches(&wo));
    }

    #[test]
    fn test_matches_status_and_before() {
        let filter = WorkOrderFilter::new()
            .before(DateField::Received, d(2024, 1, 1))
            .status_in(&[WorkOrderStatus::New, WorkOrderStatus::ForAudit]);
        let mut wo = WorkOrder::new("WO-1", WorkOrderStatus::ForAudit);
        wo.date_received = Some(d(2023, 12, 31));
        assert!(filter.matches(&wo));
        wo.date_received = Some(d(2024, 1, 1));
        assert!(!filter.matches(&wo));
        wo.date_received = Some(d(2023, 6, 1));
        wo.status = WorkOrderStatus::Paid;
        assert!(!filter.matches(&wo));
    }
}

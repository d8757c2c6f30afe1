use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Lifecycle status of a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkOrderStatus {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "FOR AUDIT")]
    ForAudit,
    #[serde(rename = "NO COC")]
    NoCoc,
    #[serde(rename = "AUDITED")]
    Audited,
    #[serde(rename = "PAID")]
    Paid,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl WorkOrderStatus {
    pub const ALL: [WorkOrderStatus; 6] = [
        WorkOrderStatus::New,
        WorkOrderStatus::ForAudit,
        WorkOrderStatus::NoCoc,
        WorkOrderStatus::Audited,
        WorkOrderStatus::Paid,
        WorkOrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::New => "NEW",
            WorkOrderStatus::ForAudit => "FOR AUDIT",
            WorkOrderStatus::NoCoc => "NO COC",
            WorkOrderStatus::Audited => "AUDITED",
            WorkOrderStatus::Paid => "PAID",
            WorkOrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkOrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('_', " ");
        WorkOrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| Error::DataSource(format!("unknown work order status: {s}")))
    }
}

/// The slice of a work order the indicators read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub wo_no: String,
    pub vendor_id: Option<String>,
    pub description: Option<String>,
    pub status: WorkOrderStatus,
    /// Date the work order jacket was received.
    pub date_received: Option<NaiveDate>,
    pub date_awarding: Option<NaiveDate>,
    pub date_energized: Option<NaiveDate>,
    pub date_coc_received: Option<NaiveDate>,
    pub date_for_audit: Option<NaiveDate>,
    pub date_audited: Option<NaiveDate>,
    pub labor_hours: Option<f64>,
    pub estimated_cost: Option<f64>,
    pub billed_cost: Option<f64>,
    pub is_delayed: bool,
    pub delay_days: i64,
}

impl WorkOrder {
    /// A work order with only a number and status set.
    pub fn new(wo_no: impl Into<String>, status: WorkOrderStatus) -> Self {
        Self {
            wo_no: wo_no.into(),
            vendor_id: None,
            description: None,
            status,
            date_received: None,
            date_awarding: None,
            date_energized: None,
            date_coc_received: None,
            date_for_audit: None,
            date_audited: None,
            labor_hours: None,
            estimated_cost: None,
            billed_cost: None,
            is_delayed: false,
            delay_days: 0,
        }
    }
}

/// One vendor's accomplishment against capability for a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorProductivity {
    pub vendor_id: String,
    pub vendor_name: String,
    /// First day of the month the row covers.
    pub month: NaiveDate,
    pub monthly_accomplishment: f64,
    pub monthly_capability: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("FOR AUDIT".parse::<WorkOrderStatus>().unwrap(), WorkOrderStatus::ForAudit);
        assert_eq!("for_audit".parse::<WorkOrderStatus>().unwrap(), WorkOrderStatus::ForAudit);
        assert_eq!("paid".parse::<WorkOrderStatus>().unwrap(), WorkOrderStatus::Paid);
        assert!("SHIPPED".parse::<WorkOrderStatus>().is_err());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for st in WorkOrderStatus::ALL {
            assert_eq!(st.as_str().parse::<WorkOrderStatus>().unwrap(), st);
        }
    }
}

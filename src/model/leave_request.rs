use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{
    days::Days,
    leave_status::{LeaveStatus, SlotStatus},
};

/// At most this many managers approve a single request.
pub const MAX_APPROVERS: usize = 3;

/// One assigned approver and the decision they recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApproverSlot {
    /// 1-based position; slot 1 is the primary manager
    #[schema(example = 1)]
    pub slot: u8,
    /// Employee id of the manager
    #[schema(example = 2000)]
    pub manager_id: u64,
    #[schema(example = "Jane Roe")]
    pub manager_name: String,
    pub status: SlotStatus,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApproverSlot {
    pub fn pending(slot: u8, manager_id: u64, manager_name: String) -> Self {
        ApproverSlot {
            slot,
            manager_id,
            manager_name,
            status: SlotStatus::Pending,
            notes: None,
            decided_at: None,
        }
    }
}

/// A manager assigned to an employee, as held by the employee directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerAssignment {
    pub slot: u8,
    pub manager_id: u64,
    pub manager_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeProfile {
    pub employee_id: u64,
    pub name: String,
    pub managers: Vec<ManagerAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "LR-4F1C2A9B7D")]
    pub series: String,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(example = "Sick Leave")]
    pub leave_type: String,
    /// Remaining balance when the request was submitted
    #[schema(value_type = Option<f64>, example = 5)]
    pub leave_balance_before: Option<Days>,
    #[schema(value_type = String, format = "date", example = "2026-01-01")]
    pub from_date: NaiveDate,
    /// Absent for single-day requests
    #[schema(value_type = Option<String>, format = "date", example = "2026-01-03")]
    pub to_date: Option<NaiveDate>,
    pub half_day: bool,
    #[schema(value_type = f64, example = 3)]
    pub total_leave_days: Days,
    #[schema(example = "Family function")]
    pub reason: String,
    pub status: LeaveStatus,
    pub approvers: Vec<ApproverSlot>,
    pub hr_id: Option<u64>,
    pub hr_name: Option<String>,
    pub hr_approval_notes: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub manager_approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub hr_approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// A request about to be inserted; the store assigns id and `created_at`.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub series: String,
    pub employee_id: u64,
    pub employee_name: String,
    pub leave_type: String,
    pub leave_balance_before: Option<Days>,
    pub from_date: NaiveDate,
    pub to_date: Option<NaiveDate>,
    pub half_day: bool,
    pub total_leave_days: Days,
    pub reason: String,
    pub status: LeaveStatus,
    pub approvers: Vec<ApproverSlot>,
}

impl NewLeaveRequest {
    #[cfg(test)]
    pub fn into_request(self, id: u64, created_at: DateTime<Utc>) -> LeaveRequest {
        LeaveRequest {
            id,
            series: self.series,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            leave_type: self.leave_type,
            leave_balance_before: self.leave_balance_before,
            from_date: self.from_date,
            to_date: self.to_date,
            half_day: self.half_day,
            total_leave_days: self.total_leave_days,
            reason: self.reason,
            status: self.status,
            approvers: self.approvers,
            hr_id: None,
            hr_name: None,
            hr_approval_notes: None,
            created_at,
            manager_approved_at: None,
            hr_approved_at: None,
            cancelled_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ApprovalProgress {
    #[schema(example = 1)]
    pub approved: usize,
    #[schema(example = 2)]
    pub required: usize,
}

impl LeaveRequest {
    /// Balance year; a request belongs to the year it starts in.
    pub fn year(&self) -> i32 {
        self.from_date.year()
    }

    pub fn slot_for(&self, manager_id: u64) -> Option<&ApproverSlot> {
        self.approvers.iter().find(|s| s.manager_id == manager_id)
    }

    pub fn progress(&self) -> ApprovalProgress {
        ApprovalProgress {
            approved: self
                .approvers
                .iter()
                .filter(|s| s.status == SlotStatus::Approved)
                .count(),
            required: self.approvers.len(),
        }
    }
}

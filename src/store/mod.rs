//! Persistence for the leave workflow.
//!
//! Every mutation of an existing request goes through `update_request` or
//! `update_request_with_ledger`. Implementations must run the closure while
//! holding the request (and, for the latter, its ledger) exclusively, and
//! must persist nothing when the closure returns an error.

#[cfg(test)]
pub mod memory;
pub mod mysql;

use crate::{
    error::LeaveError,
    model::{
        balance::{Ledger, LedgerScope},
        leave_request::{EmployeeProfile, LeaveRequest, NewLeaveRequest},
        leave_status::LeaveStatus,
        leave_type::{LeaveType, LeaveTypeInput},
    },
};

/// Filter for request listings.
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
    pub employee_id: Option<u64>,
    /// Empty means any status
    pub statuses: Vec<LeaveStatus>,
    /// Only requests where this manager still holds a pending slot
    pub pending_approver: Option<u64>,
    pub oldest_first: bool,
    pub limit: Option<u64>,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct RequestPage {
    pub items: Vec<LeaveRequest>,
    pub total: i64,
}

#[allow(async_fn_in_trait)]
pub trait LeaveStore {
    async fn leave_types(&self, include_inactive: bool) -> Result<Vec<LeaveType>, LeaveError>;

    /// Case-insensitive lookup by name.
    async fn leave_type_by_name(&self, name: &str) -> Result<Option<LeaveType>, LeaveError>;

    async fn insert_leave_type(&self, input: &LeaveTypeInput) -> Result<LeaveType, LeaveError>;

    async fn update_leave_type(
        &self,
        id: u64,
        input: &LeaveTypeInput,
    ) -> Result<LeaveType, LeaveError>;

    async fn deactivate_leave_type(&self, id: u64) -> Result<LeaveType, LeaveError>;

    async fn employee_profile(&self, employee_id: u64)
    -> Result<Option<EmployeeProfile>, LeaveError>;

    /// Zeros when the ledger was never created.
    async fn ledger(&self, scope: &LedgerScope) -> Result<Ledger, LeaveError>;

    /// Per-type ledgers of an employee for a year, ordered by leave type.
    async fn ledgers_for_employee(
        &self,
        employee_id: u64,
        year: i32,
    ) -> Result<Vec<(String, Ledger)>, LeaveError>;

    /// Locks the ledger (creating it lazily) for the duration of `apply`.
    async fn update_ledger<F, T>(&self, scope: &LedgerScope, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, LeaveError>;

    async fn insert_request(&self, request: NewLeaveRequest) -> Result<LeaveRequest, LeaveError>;

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>, LeaveError>;

    async fn list_requests(&self, query: &RequestQuery) -> Result<RequestPage, LeaveError>;

    async fn update_request<F, T>(&self, id: u64, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut LeaveRequest) -> Result<T, LeaveError>;

    /// Like `update_request`, also locking the ledger the request draws from.
    /// The ledger is `None` for leave types without a balance.
    async fn update_request_with_ledger<F, T>(&self, id: u64, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut LeaveRequest, Option<&mut Ledger>) -> Result<T, LeaveError>;
}

pub(crate) fn request_not_found(id: u64) -> LeaveError {
    LeaveError::NotFound(format!("Leave request {id} not found"))
}

pub(crate) fn leave_type_not_found(id: u64) -> LeaveError {
    LeaveError::NotFound(format!("Leave type {id} not found"))
}

pub(crate) fn duplicate_leave_type(name: &str) -> LeaveError {
    LeaveError::Conflict(format!("Leave type with name '{name}' already exists"))
}

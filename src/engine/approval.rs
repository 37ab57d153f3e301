//! Transitions applied to a locked request (and its ledger).
//!
//! Each function validates authority, asks the status table for the next
//! state, and only then mutates. An `Err` leaves the request and ledger as
//! they were, so the store can roll back without partial writes.

use chrono::{DateTime, Utc};

use crate::{
    error::LeaveError,
    model::{
        balance::Ledger,
        leave_request::LeaveRequest,
        leave_status::{Decision, LeaveEvent, LeaveStatus, SlotStatus},
    },
};

/// The HR/Admin user recording a decision.
#[derive(Debug, Clone)]
pub struct HrReviewer {
    pub id: u64,
    pub name: String,
}

pub fn manager_decide(
    request: &mut LeaveRequest,
    manager_id: u64,
    decision: Decision,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), LeaveError> {
    let index = request
        .approvers
        .iter()
        .position(|s| s.manager_id == manager_id)
        .ok_or_else(|| {
            LeaveError::not_authorized("You are not an assigned approver for this leave request")
        })?;

    let event = match decision {
        Decision::Approve => LeaveEvent::ManagerApprove {
            all_approved: request
                .approvers
                .iter()
                .enumerate()
                .all(|(i, s)| i == index || s.status == SlotStatus::Approved),
        },
        Decision::Reject => LeaveEvent::ManagerReject,
    };
    let next = request.status.next(event)?;

    let slot = &mut request.approvers[index];
    if slot.status != SlotStatus::Pending {
        return Err(LeaveError::InvalidStateTransition {
            status: request.status,
            action: "decide again on",
        });
    }

    slot.status = match decision {
        Decision::Approve => SlotStatus::Approved,
        Decision::Reject => SlotStatus::Rejected,
    };
    slot.notes = notes;
    slot.decided_at = Some(now);

    if next == LeaveStatus::PendingHrApproval {
        request.manager_approved_at = Some(now);
    }
    request.status = next;
    Ok(())
}

/// Final approval. Deducts from `ledger` when the leave type has one.
pub fn hr_approve(
    request: &mut LeaveRequest,
    ledger: Option<&mut Ledger>,
    reviewer: &HrReviewer,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), LeaveError> {
    let next = request.status.next(LeaveEvent::HrApprove)?;

    if let Some(ledger) = ledger {
        ledger.deduct(request.total_leave_days)?;
    }

    record_hr_decision(request, next, reviewer, notes, now);
    Ok(())
}

pub fn hr_reject(
    request: &mut LeaveRequest,
    reviewer: &HrReviewer,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), LeaveError> {
    let next = request.status.next(LeaveEvent::HrReject)?;
    record_hr_decision(request, next, reviewer, notes, now);
    Ok(())
}

fn record_hr_decision(
    request: &mut LeaveRequest,
    next: LeaveStatus,
    reviewer: &HrReviewer,
    notes: Option<String>,
    now: DateTime<Utc>,
) {
    request.status = next;
    request.hr_id = Some(reviewer.id);
    request.hr_name = Some(reviewer.name.clone());
    request.hr_approval_notes = notes;
    request.hr_approved_at = Some(now);
}

/// The owner pulls back a request that is still awaiting a decision.
pub fn withdraw(
    request: &mut LeaveRequest,
    employee_id: u64,
    now: DateTime<Utc>,
) -> Result<(), LeaveError> {
    if request.employee_id != employee_id {
        return Err(LeaveError::not_authorized(
            "Only the employee who submitted the request can withdraw it",
        ));
    }

    request.status = request.status.next(LeaveEvent::Withdraw)?;
    request.cancelled_at = Some(now);
    Ok(())
}

/// Cancels an approved request and gives the days back.
pub fn cancel_approved(
    request: &mut LeaveRequest,
    ledger: Option<&mut Ledger>,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), LeaveError> {
    let next = request.status.next(LeaveEvent::CancelApproved)?;

    if let Some(ledger) = ledger {
        ledger.restore(request.total_leave_days);
    }

    request.status = next;
    request.cancelled_at = Some(now);
    if notes.is_some() {
        request.hr_approval_notes = notes;
    }
    Ok(())
}

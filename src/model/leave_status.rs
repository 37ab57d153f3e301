use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::LeaveError;

/// Lifecycle of a leave request.
///
/// Stored as its display string. Parsing is case-insensitive and accepts the
/// legacy spellings found in older rows (`manager_approved`, `approved`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum LeaveStatus {
    #[strum(to_string = "Pending Manager Approval")]
    #[serde(rename = "Pending Manager Approval")]
    PendingManagerApproval,
    /// Legacy intermediate state. HR may still decide on it.
    #[strum(to_string = "Manager Approved", serialize = "manager_approved")]
    #[serde(rename = "Manager Approved")]
    ManagerApproved,
    #[strum(to_string = "Pending HR Approval")]
    #[serde(rename = "Pending HR Approval")]
    PendingHrApproval,
    #[strum(to_string = "Approved")]
    Approved,
    #[strum(to_string = "Rejected")]
    Rejected,
    #[strum(to_string = "Cancelled")]
    Cancelled,
}

/// Per-approver decision state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum SlotStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Everything that can move a request between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveEvent {
    /// `all_approved` is true when this approval was the last pending slot.
    ManagerApprove { all_approved: bool },
    ManagerReject,
    HrApprove,
    HrReject,
    Withdraw,
    CancelApproved,
}

impl LeaveEvent {
    fn action(self) -> &'static str {
        match self {
            LeaveEvent::ManagerApprove { .. } | LeaveEvent::HrApprove => "approve",
            LeaveEvent::ManagerReject | LeaveEvent::HrReject => "reject",
            LeaveEvent::Withdraw => "withdraw",
            LeaveEvent::CancelApproved => "cancel",
        }
    }
}

impl LeaveStatus {
    /// Statuses in which HR may record its decision.
    pub const AWAITING_HR: [LeaveStatus; 2] =
        [LeaveStatus::PendingHrApproval, LeaveStatus::ManagerApproved];

    /// The transition table. Any pair not listed is rejected.
    pub fn next(self, event: LeaveEvent) -> Result<LeaveStatus, LeaveError> {
        use LeaveEvent as E;
        use LeaveStatus as S;

        let next = match (self, event) {
            (S::PendingManagerApproval, E::ManagerApprove { all_approved: false }) => {
                S::PendingManagerApproval
            }
            (S::PendingManagerApproval, E::ManagerApprove { all_approved: true }) => {
                S::PendingHrApproval
            }
            (S::PendingManagerApproval, E::ManagerReject) => S::Rejected,
            (S::PendingHrApproval | S::ManagerApproved, E::HrApprove) => S::Approved,
            (S::PendingHrApproval | S::ManagerApproved, E::HrReject) => S::Rejected,
            (S::PendingManagerApproval | S::PendingHrApproval | S::ManagerApproved, E::Withdraw) => {
                S::Cancelled
            }
            (S::Approved, E::CancelApproved) => S::Cancelled,
            (status, event) => {
                return Err(LeaveError::InvalidStateTransition {
                    status,
                    action: event.action(),
                });
            }
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn happy_path_through_managers_and_hr() {
        let status = LeaveStatus::PendingManagerApproval;
        let status = status.next(LeaveEvent::ManagerApprove { all_approved: false }).unwrap();
        assert_eq!(status, LeaveStatus::PendingManagerApproval);
        let status = status.next(LeaveEvent::ManagerApprove { all_approved: true }).unwrap();
        assert_eq!(status, LeaveStatus::PendingHrApproval);
        let status = status.next(LeaveEvent::HrApprove).unwrap();
        assert_eq!(status, LeaveStatus::Approved);
    }

    #[test]
    fn terminal_states_reject_every_decision() {
        let events = [
            LeaveEvent::ManagerApprove { all_approved: true },
            LeaveEvent::ManagerReject,
            LeaveEvent::HrApprove,
            LeaveEvent::HrReject,
            LeaveEvent::Withdraw,
        ];
        for status in [LeaveStatus::Approved, LeaveStatus::Rejected, LeaveStatus::Cancelled] {
            for event in events {
                assert!(matches!(
                    status.next(event),
                    Err(LeaveError::InvalidStateTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn hr_cannot_skip_manager_stage() {
        let err = LeaveStatus::PendingManagerApproval
            .next(LeaveEvent::HrApprove)
            .unwrap_err();
        assert!(matches!(err, LeaveError::InvalidStateTransition { .. }));
    }

    #[test]
    fn managers_cannot_act_on_hr_stage() {
        assert!(LeaveStatus::PendingHrApproval.next(LeaveEvent::ManagerReject).is_err());
    }

    #[test]
    fn only_approved_requests_can_be_cancelled() {
        assert_eq!(
            LeaveStatus::Approved.next(LeaveEvent::CancelApproved).unwrap(),
            LeaveStatus::Cancelled
        );
        assert!(LeaveStatus::PendingHrApproval.next(LeaveEvent::CancelApproved).is_err());
    }

    #[test]
    fn legacy_manager_approved_is_decidable_by_hr() {
        assert_eq!(
            LeaveStatus::ManagerApproved.next(LeaveEvent::HrReject).unwrap(),
            LeaveStatus::Rejected
        );
    }

    #[test]
    fn parses_stored_spellings() {
        assert_eq!(
            LeaveStatus::from_str("Pending Manager Approval").unwrap(),
            LeaveStatus::PendingManagerApproval
        );
        assert_eq!(
            LeaveStatus::from_str("manager_approved").unwrap(),
            LeaveStatus::ManagerApproved
        );
        assert_eq!(LeaveStatus::from_str("approved").unwrap(), LeaveStatus::Approved);
        assert_eq!(LeaveStatus::PendingHrApproval.to_string(), "Pending HR Approval");
        assert!(LeaveStatus::from_str("Partially Approved (1/2)").is_err());
    }
}

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::model::{days::Days, leave_status::LeaveStatus};

/// Every failure the leave workflow can report to a caller.
#[derive(Debug, Error)]
pub enum LeaveError {
    /// Malformed or incomplete input.
    #[error("{0}")]
    Validation(String),

    /// The balance backing the leave type cannot cover the request.
    #[error("Insufficient leave balance: {remaining} remaining, {requested} requested")]
    InsufficientBalance { remaining: Days, requested: Days },

    /// The actor is not an assigned approver, not HR, or not the owner.
    #[error("{0}")]
    NotAuthorized(String),

    /// The request is not in a state that accepts the attempted action.
    #[error("Cannot {action} a leave request that is {status}")]
    InvalidStateTransition {
        status: LeaveStatus,
        action: &'static str,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A stored row could not be mapped back into the domain model.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl LeaveError {
    pub fn validation(message: impl Into<String>) -> Self {
        LeaveError::Validation(message.into())
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        LeaveError::NotAuthorized(message.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            LeaveError::Validation(_) => "validation_error",
            LeaveError::InsufficientBalance { .. } => "insufficient_balance",
            LeaveError::NotAuthorized(_) => "not_authorized",
            LeaveError::InvalidStateTransition { .. } => "invalid_state_transition",
            LeaveError::NotFound(_) => "not_found",
            LeaveError::Conflict(_) => "conflict",
            LeaveError::CorruptRecord(_) | LeaveError::Database(_) => "internal_error",
        }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation(_) | LeaveError::InsufficientBalance { .. } => {
                StatusCode::BAD_REQUEST
            }
            LeaveError::NotAuthorized(_) => StatusCode::FORBIDDEN,
            LeaveError::InvalidStateTransition { .. } | LeaveError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::CorruptRecord(_) | LeaveError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            LeaveError::CorruptRecord(_) | LeaveError::Database(_) => {
                tracing::error!(error = %self, "Leave workflow storage failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn insufficient_balance_renders_actionable_message() {
        let err = LeaveError::InsufficientBalance {
            remaining: Days::whole(2),
            requested: Days::whole(3),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "insufficient_balance");
        assert_eq!(
            value["message"],
            "Insufficient leave balance: 2 remaining, 3 requested"
        );
    }

    #[actix_web::test]
    async fn database_errors_do_not_leak_details() {
        let err = LeaveError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "internal_error");
        assert_eq!(value["message"], "Internal Server Error");
    }

    #[test]
    fn state_errors_map_to_conflict() {
        let err = LeaveError::InvalidStateTransition {
            status: LeaveStatus::Approved,
            action: "approve",
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "Cannot approve a leave request that is Approved"
        );
    }
}

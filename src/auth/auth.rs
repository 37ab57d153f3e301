use crate::auth::middleware::AuthRejection;
use crate::error::LeaveError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

/// Reads the identity `auth_middleware` stored on the request.
impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AuthRejection::Unauthenticated.into()),
        )
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> Result<(), LeaveError> {
        if self.role.is_hr() {
            Ok(())
        } else {
            Err(LeaveError::not_authorized("HR/Admin only"))
        }
    }

    /// Employee id of the caller, required for anything done on their own behalf
    pub fn require_employee(&self) -> Result<u64, LeaveError> {
        self.employee_id
            .ok_or_else(|| LeaveError::not_authorized("No employee profile"))
    }

    /// True for HR/Admin or for the employee themself
    pub fn can_view_employee(&self, employee_id: u64) -> bool {
        self.role.is_hr() || self.employee_id == Some(employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn hr_user() -> AuthUser {
        AuthUser {
            user_id: 7,
            username: "jane".to_string(),
            role: Role::Hr,
            employee_id: Some(1000),
        }
    }

    #[actix_web::test]
    async fn extracts_identity_left_by_middleware() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(hr_user());

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.employee_id, Some(1000));
        assert!(user.require_hr_or_admin().is_ok());
    }

    #[actix_web::test]
    async fn missing_identity_is_unauthorized() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer unverified"))
            .to_http_request();

        let err = AuthUser::extract(&req).await.unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn employees_see_only_themselves() {
        let user = AuthUser {
            user_id: 1,
            username: "sam".to_string(),
            role: Role::Employee,
            employee_id: Some(10),
        };
        assert!(user.can_view_employee(10));
        assert!(!user.can_view_employee(11));
        assert!(matches!(
            user.require_hr_or_admin(),
            Err(LeaveError::NotAuthorized(_))
        ));
    }
}

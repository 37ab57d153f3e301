use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    web::Data,
};
use serde_json::json;

/// Why a request was refused before reaching a handler. Always a 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header must start with Bearer")]
    NotBearer,

    #[error("Invalid or expired token")]
    InvalidToken(String),

    #[error("Access token required")]
    NotAccessToken,

    #[error("Invalid role")]
    UnknownRole(u8),

    /// Handler reached without a verified identity.
    #[error("Authentication required")]
    Unauthenticated,
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingHeader)?
        .to_str()
        .map_err(|_| AuthRejection::NotBearer)?;

    value.strip_prefix("Bearer ").ok_or(AuthRejection::NotBearer)
}

/// Turn the bearer token into the caller's identity.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthUser, AuthRejection> {
    let claims = verify_token(bearer_token(headers)?, secret).map_err(AuthRejection::InvalidToken)?;

    if claims.token_type != TokenType::Access {
        return Err(AuthRejection::NotAccessToken);
    }
    let role = Role::from_id(claims.role).ok_or(AuthRejection::UnknownRole(claims.role))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

/// Sole verifier of bearer tokens; handlers read the result through the
/// [`AuthUser`] extractor.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match authenticate(req.headers(), &config.jwt_secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(rejection) => {
            tracing::debug!(path = %req.path(), reason = ?rejection, "Rejected request");
            let resp = rejection.error_response();
            Ok(req.into_response(resp))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Claims;
    use actix_web::{App, HttpResponse, Responder, middleware::from_fn, test, web};
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn token(token_type: TokenType, role: u8) -> String {
        let claims = Claims {
            user_id: 7,
            sub: "jane".to_string(),
            role,
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
            jti: "jti-1".to_string(),
            token_type,
            employee_id: Some(1000),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    async fn whoami(user: AuthUser) -> impl Responder {
        HttpResponse::Ok().json(json!({
            "user_id": user.user_id,
            "is_hr": user.role.is_hr(),
            "employee_id": user.employee_id,
        }))
    }

    async fn status_for(authorization: Option<String>) -> (StatusCode, serde_json::Value) {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(Config::for_tests(SECRET)))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .route("/me", web::get().to(whoami)),
                ),
        )
        .await;

        let mut req = test::TestRequest::get().uri("/api/me");
        if let Some(value) = authorization {
            req = req.insert_header((AUTHORIZATION, value));
        }
        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        let body: serde_json::Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn access_token_reaches_the_handler() {
        let (status, body) = status_for(Some(format!("Bearer {}", token(TokenType::Access, 2)))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], 7);
        assert_eq!(body["employee_id"], 1000);
        assert_eq!(body["is_hr"], true);
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let (status, body) = status_for(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Missing Authorization header");
    }

    #[actix_web::test]
    async fn refresh_token_is_unauthorized() {
        let (status, body) = status_for(Some(format!("Bearer {}", token(TokenType::Refresh, 3)))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Access token required");
    }

    #[actix_web::test]
    async fn unknown_role_is_unauthorized() {
        let (status, body) = status_for(Some(format!("Bearer {}", token(TokenType::Access, 9)))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid role");
    }

    #[actix_web::test]
    async fn malformed_credentials_are_unauthorized() {
        let (status, _) = status_for(Some("Bearer not-a-jwt".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = status_for(Some(format!("Token {}", token(TokenType::Access, 2)))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }
}

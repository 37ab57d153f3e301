use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::AppEngine,
    auth::auth::AuthUser,
    model::leave_type::{LeaveType, LeaveTypeInput},
};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveTypeQuery {
    /// Include deactivated types (HR/Admin only)
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveTypeResponse {
    #[schema(example = "Leave type created")]
    pub message: String,
    pub leave_type: LeaveType,
}

impl LeaveTypeResponse {
    fn new(message: &str, leave_type: LeaveType) -> Self {
        LeaveTypeResponse {
            message: message.to_string(),
            leave_type,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/leave-types",
    params(LeaveTypeQuery),
    responses(
        (status = 200, description = "Leave types ordered by name", body = [LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn list_leave_types(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    query: web::Query<LeaveTypeQuery>,
) -> actix_web::Result<impl Responder> {
    let types = engine.leave_types(&auth, query.include_inactive).await?;

    Ok(HttpResponse::Ok().json(types))
}

#[utoipa::path(
    post,
    path = "/api/leave-types",
    request_body = LeaveTypeInput,
    responses(
        (status = 201, description = "Leave type created", body = LeaveTypeResponse),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Name already in use", body = Object, example = json!({
            "error": "conflict",
            "message": "Leave type with name 'Sick Leave' already exists"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn create_leave_type(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    payload: web::Json<LeaveTypeInput>,
) -> actix_web::Result<impl Responder> {
    let created = engine.create_leave_type(&auth, payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(LeaveTypeResponse::new("Leave type created", created)))
}

#[utoipa::path(
    put,
    path = "/api/leave-types/{leave_type_id}",
    params(
        ("leave_type_id" = u64, Path, description = "ID of the leave type to update")
    ),
    request_body = LeaveTypeInput,
    responses(
        (status = 200, description = "Leave type updated", body = LeaveTypeResponse),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave type not found"),
        (status = 409, description = "Name already in use")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn update_leave_type(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
    payload: web::Json<LeaveTypeInput>,
) -> actix_web::Result<impl Responder> {
    let updated = engine
        .update_leave_type(&auth, path.into_inner(), payload.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveTypeResponse::new("Leave type updated", updated)))
}

/// Deactivates the type; existing requests keep referring to it.
#[utoipa::path(
    delete,
    path = "/api/leave-types/{leave_type_id}",
    params(
        ("leave_type_id" = u64, Path, description = "ID of the leave type to deactivate")
    ),
    responses(
        (status = 200, description = "Leave type deactivated", body = LeaveTypeResponse),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave type not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn delete_leave_type(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let deactivated = engine
        .deactivate_leave_type(&auth, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveTypeResponse::new("Leave type deactivated", deactivated)))
}

use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::AppEngine,
    auth::auth::AuthUser,
    engine::{DecisionInput, SubmitLeave},
    error::LeaveError,
    model::{
        leave_request::{ApprovalProgress, LeaveRequest},
        leave_status::LeaveStatus,
    },
};

/// A request together with how far manager approval has progressed.
#[derive(Serialize, ToSchema)]
pub struct LeaveView {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub progress: ApprovalProgress,
}

impl From<LeaveRequest> for LeaveView {
    fn from(request: LeaveRequest) -> Self {
        let progress = request.progress();
        LeaveView { request, progress }
    }
}

fn views(requests: Vec<LeaveRequest>) -> Vec<LeaveView> {
    requests.into_iter().map(LeaveView::from).collect()
}

#[derive(Serialize, ToSchema)]
pub struct LeaveResponse {
    #[schema(example = "Leave request submitted")]
    pub message: String,
    pub leave: LeaveView,
}

impl LeaveResponse {
    fn new(message: &str, request: LeaveRequest) -> Self {
        LeaveResponse {
            message: message.to_string(),
            leave: request.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveView>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "Pending HR Approval")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

#[derive(Deserialize, ToSchema)]
pub struct CancelLeave {
    #[schema(example = "Trip called off")]
    pub notes: Option<String>,
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = SubmitLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveResponse),
        (status = 400, description = "Validation error or insufficient balance", body = Object, example = json!({
            "error": "insufficient_balance",
            "message": "Insufficient leave balance: 2 remaining, 3 requested"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    payload: web::Json<SubmitLeave>,
) -> actix_web::Result<impl Responder> {
    let request = engine.submit(&auth, payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(LeaveResponse::new("Leave request submitted", request)))
}

/* =========================
Manager decision
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/manager-decision",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    request_body = DecisionInput,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveResponse),
        (status = 403, description = "Not an assigned approver"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request or slot already decided", body = Object, example = json!({
            "error": "invalid_state_transition",
            "message": "Cannot approve a leave request that is Rejected"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn manager_decision(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
    payload: web::Json<DecisionInput>,
) -> actix_web::Result<impl Responder> {
    let request = engine
        .manager_decide(&auth, path.into_inner(), payload.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveResponse::new("Manager decision recorded", request)))
}

/* =========================
HR decision (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/hr-decision",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    request_body = DecisionInput,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveResponse),
        (status = 400, description = "Insufficient balance"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is not awaiting HR")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn hr_decision(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
    payload: web::Json<DecisionInput>,
) -> actix_web::Result<impl Responder> {
    let request = engine
        .hr_decide(&auth, path.into_inner(), payload.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveResponse::new("HR decision recorded", request)))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/withdraw",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to withdraw")
    ),
    responses(
        (status = 200, description = "Leave request withdrawn", body = LeaveResponse),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Request already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn withdraw_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = engine.withdraw(&auth, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LeaveResponse::new("Leave request withdrawn", request)))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the approved leave request")
    ),
    request_body = CancelLeave,
    responses(
        (status = 200, description = "Approved leave cancelled and balance restored", body = LeaveResponse),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Request is not approved")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
    payload: Option<web::Json<CancelLeave>>,
) -> actix_web::Result<impl Responder> {
    let notes = payload.and_then(|p| p.into_inner().notes);
    let request = engine
        .cancel_approved(&auth, path.into_inner(), notes)
        .await?;

    Ok(HttpResponse::Ok().json(LeaveResponse::new("Approved leave cancelled", request)))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "error": "not_found",
            "message": "Leave request 7 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = engine.get_request(&auth, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LeaveView::from(request)))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);

    let status = match query.status.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            LeaveStatus::from_str(raw)
                .map_err(|_| LeaveError::validation(format!("Unknown leave status '{raw}'")))?,
        ),
        _ => None,
    };

    let result = engine
        .list_requests(&auth, query.employee_id, status, page, per_page)
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: views(result.items),
        page,
        per_page,
        total: result.total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leave/mine",
    responses(
        (status = 200, description = "Caller's leave requests, newest first", body = [LeaveView]),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let requests = engine.requests_for_employee(&auth, employee_id).await?;

    Ok(HttpResponse::Ok().json(views(requests)))
}

#[utoipa::path(
    get,
    path = "/api/leave/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee whose requests to list")
    ),
    responses(
        (status = 200, description = "Employee's leave requests, newest first", body = [LeaveView]),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn employee_leaves(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let requests = engine
        .requests_for_employee(&auth, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(views(requests)))
}

#[utoipa::path(
    get,
    path = "/api/leave/manager/pending",
    responses(
        (status = 200, description = "Requests waiting on the caller's approval, oldest first", body = [LeaveView]),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn manager_pending(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
) -> actix_web::Result<impl Responder> {
    let requests = engine.pending_for_manager(&auth).await?;

    Ok(HttpResponse::Ok().json(views(requests)))
}

#[utoipa::path(
    get,
    path = "/api/leave/hr/pending",
    responses(
        (status = 200, description = "Requests waiting on HR, oldest first", body = [LeaveView]),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn hr_pending(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
) -> actix_web::Result<impl Responder> {
    let requests = engine.pending_for_hr(&auth).await?;

    Ok(HttpResponse::Ok().json(views(requests)))
}

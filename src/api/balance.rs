use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::AppEngine,
    auth::auth::AuthUser,
    engine::{AllocateBalance, GrantCompOff},
    model::balance::Ledger,
};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BalanceQuery {
    /// Defaults to the caller
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = "Sick Leave")]
    pub leave_type: String,
    /// Defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct YearQuery {
    /// Defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct CompOffResponse {
    #[schema(example = "Comp-off granted")]
    pub message: String,
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub comp_off: Ledger,
}

#[utoipa::path(
    get,
    path = "/api/leave/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Balance for one leave type; zeros when never allocated", body = LeaveBalance),
        (status = 400, description = "Missing leave type"),
        (status = 403, description = "Only your own balance unless HR/Admin")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn get_balance(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.require_employee()?,
    };

    let balance = engine
        .balance(&auth, employee_id, &query.leave_type, query.year)
        .await?;

    Ok(HttpResponse::Ok().json(balance))
}

#[utoipa::path(
    get,
    path = "/api/leave/balances/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee whose balances to read"),
        YearQuery
    ),
    responses(
        (status = 200, description = "Every ledger of the employee for the year", body = EmployeeBalances),
        (status = 403, description = "Only your own balances unless HR/Admin")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn employee_balances(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<u64>,
    query: web::Query<YearQuery>,
) -> actix_web::Result<impl Responder> {
    let balances = engine
        .balances_for_employee(&auth, path.into_inner(), query.year)
        .await?;

    Ok(HttpResponse::Ok().json(balances))
}

/* =========================
Allocate balance (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/balances",
    request_body = AllocateBalance,
    responses(
        (status = 200, description = "Allocation saved", body = LeaveBalance),
        (status = 400, description = "Negative, below used days, or untracked leave type", body = Object, example = json!({
            "error": "validation_error",
            "message": "Allocation of 2 is below the 3 days already used"
        })),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn allocate_balance(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    payload: web::Json<AllocateBalance>,
) -> actix_web::Result<impl Responder> {
    let balance = engine.allocate(&auth, payload.into_inner()).await?;

    Ok(HttpResponse::Ok().json(balance))
}

#[utoipa::path(
    post,
    path = "/api/leave/comp-off",
    request_body = GrantCompOff,
    responses(
        (status = 200, description = "Comp-off days credited", body = CompOffResponse),
        (status = 400, description = "Days must be a positive multiple of 0.5"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn grant_comp_off(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    payload: web::Json<GrantCompOff>,
) -> actix_web::Result<impl Responder> {
    let input = payload.into_inner();
    let employee_id = input.employee_id;
    let comp_off = engine.grant_comp_off(&auth, input).await?;

    Ok(HttpResponse::Ok().json(CompOffResponse {
        message: "Comp-off granted".to_string(),
        employee_id,
        comp_off,
    }))
}

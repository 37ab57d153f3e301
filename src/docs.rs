use crate::api::balance::{BalanceQuery, CompOffResponse, YearQuery};
use crate::api::leave_request::{CancelLeave, LeaveFilter, LeaveListResponse, LeaveResponse, LeaveView};
use crate::api::leave_type::{LeaveTypeQuery, LeaveTypeResponse};
use crate::engine::{AllocateBalance, DecisionInput, GrantCompOff, SubmitLeave};
use crate::model::balance::{EmployeeBalances, Ledger, LeaveBalance};
use crate::model::leave_request::{ApprovalProgress, ApproverSlot, LeaveRequest};
use crate::model::leave_status::{Decision, LeaveStatus, SlotStatus};
use crate::model::leave_type::{BalanceRule, LeaveType, LeaveTypeInput};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave Management

Multi-stage leave approval for the HRM system.

### 🔹 Workflow
- An employee **submits** a leave request; the balance is checked but not touched
- Up to **three assigned managers** approve; the first rejection is final
- **HR** gives the final decision; approval deducts the balance atomically
- Approved leave can be **cancelled** by HR, which restores the days

### 🔐 Security
Every endpoint requires a **JWT Bearer** access token.
HR decisions, allocations and leave-type edits need the **Admin** or **HR** role.

### 📦 Errors
Failures are returned as `{"error": "<kind>", "message": "<details>"}`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::employee_leaves,
        crate::api::leave_request::manager_pending,
        crate::api::leave_request::hr_pending,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::manager_decision,
        crate::api::leave_request::hr_decision,
        crate::api::leave_request::withdraw_leave,
        crate::api::leave_request::cancel_leave,

        crate::api::balance::get_balance,
        crate::api::balance::employee_balances,
        crate::api::balance::allocate_balance,
        crate::api::balance::grant_comp_off,

        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::create_leave_type,
        crate::api::leave_type::update_leave_type,
        crate::api::leave_type::delete_leave_type
    ),
    components(
        schemas(
            SubmitLeave,
            DecisionInput,
            CancelLeave,
            LeaveFilter,
            LeaveRequest,
            LeaveView,
            LeaveResponse,
            LeaveListResponse,
            ApproverSlot,
            ApprovalProgress,
            LeaveStatus,
            SlotStatus,
            Decision,
            BalanceQuery,
            YearQuery,
            AllocateBalance,
            GrantCompOff,
            CompOffResponse,
            Ledger,
            LeaveBalance,
            EmployeeBalances,
            BalanceRule,
            LeaveType,
            LeaveTypeInput,
            LeaveTypeQuery,
            LeaveTypeResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request and approval APIs"),
        (name = "Leave Balance", description = "Leave balance and comp-off APIs"),
        (name = "Leave Type", description = "Leave type reference data APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_leave_route_with_bearer_auth() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/leave/{leave_id}/hr-decision"));
        assert!(doc.paths.paths.contains_key("/api/leave-types/{leave_type_id}"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("LeaveRequest"));
    }
}

//! The leave workflow service.
//!
//! `LeaveEngine` validates input, checks who is acting, and runs every state
//! change through the store's locked update so the status and the ledger move
//! together or not at all.

pub mod approval;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::auth::AuthUser,
    engine::approval::HrReviewer,
    error::LeaveError,
    model::{
        balance::{EmployeeBalances, Ledger, LedgerScope, LeaveBalance},
        days::{Days, count_days},
        leave_request::{ApproverSlot, LeaveRequest, MAX_APPROVERS, NewLeaveRequest},
        leave_status::{Decision, LeaveStatus},
        leave_type::{BalanceRule, LeaveType, LeaveTypeInput},
    },
    store::{LeaveStore, RequestPage, RequestQuery, request_not_found},
    utils::leave_type_cache::LeaveTypeCache,
};

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub allow_half_day: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitLeave {
    #[schema(example = "Sick Leave")]
    pub leave_type: String,
    #[schema(value_type = String, format = "date", example = "2026-03-02")]
    pub from_date: Option<NaiveDate>,
    /// Omit for a single-day request
    #[schema(value_type = Option<String>, format = "date", example = "2026-03-04")]
    pub to_date: Option<NaiveDate>,
    #[serde(default)]
    pub half_day: bool,
    #[schema(example = "Family function")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DecisionInput {
    pub action: Decision,
    #[schema(example = "Enjoy your time off")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AllocateBalance {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "Sick Leave")]
    pub leave_type: String,
    /// Defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
    #[schema(value_type = f64, example = 6)]
    pub total_allocated: Days,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GrantCompOff {
    #[schema(example = 1000)]
    pub employee_id: u64,
    /// Defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
    #[schema(value_type = f64, example = 1)]
    pub days: Days,
    #[schema(example = "Worked on the public holiday")]
    pub reason: Option<String>,
}

pub struct LeaveEngine<S> {
    store: S,
    leave_types: LeaveTypeCache,
    settings: EngineSettings,
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

fn current_year() -> i32 {
    Utc::now().year()
}

fn new_series() -> String {
    let id = Uuid::new_v4().to_simple().to_string();
    format!("LR-{}", id[..10].to_uppercase())
}

fn reviewer(actor: &AuthUser) -> HrReviewer {
    HrReviewer {
        id: actor.user_id,
        name: actor.username.clone(),
    }
}

impl<S: LeaveStore> LeaveEngine<S> {
    pub fn new(store: S, leave_types: LeaveTypeCache, settings: EngineSettings) -> Self {
        Self {
            store,
            leave_types,
            settings,
        }
    }

    /// Prime the leave-type cache with every active type.
    pub async fn warm_up(&self) -> Result<usize, LeaveError> {
        let types = self.store.leave_types(false).await?;
        Ok(self.leave_types.warm(types).await)
    }

    // ---------------------------------------------------------------
    // Submission
    // ---------------------------------------------------------------

    pub async fn submit(
        &self,
        actor: &AuthUser,
        input: SubmitLeave,
    ) -> Result<LeaveRequest, LeaveError> {
        let employee_id = actor.require_employee()?;

        if input.leave_type.trim().is_empty() {
            return Err(LeaveError::validation("leave_type is required"));
        }
        let from_date = input
            .from_date
            .ok_or_else(|| LeaveError::validation("from_date is required"))?;
        let reason = input
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| LeaveError::validation("reason is required"))?
            .to_string();
        if input.half_day && !self.settings.allow_half_day {
            return Err(LeaveError::validation("Half-day leave is not enabled"));
        }

        let total_leave_days = count_days(from_date, input.to_date, input.half_day)?;
        let leave_type = self.active_leave_type(&input.leave_type).await?;

        if let Some(max) = leave_type.max_days {
            if total_leave_days > max {
                return Err(LeaveError::validation(format!(
                    "{} allows at most {max} days, {total_leave_days} requested",
                    leave_type.type_name
                )));
            }
        }

        let profile = self
            .store
            .employee_profile(employee_id)
            .await?
            .ok_or_else(|| LeaveError::NotFound(format!("Employee {employee_id} not found")))?;

        // checked only; the deduction happens on HR approval
        let leave_balance_before =
            match LedgerScope::for_leave(employee_id, &leave_type.type_name, from_date.year()) {
                Some(scope) => {
                    let ledger = self.store.ledger(&scope).await?;
                    ledger.ensure_covers(total_leave_days)?;
                    Some(ledger.remaining())
                }
                None => None,
            };

        let mut approvers: Vec<ApproverSlot> = Vec::with_capacity(MAX_APPROVERS);
        for manager in &profile.managers {
            if approvers.len() == MAX_APPROVERS {
                break;
            }
            if manager.manager_id == employee_id
                || approvers.iter().any(|s| s.manager_id == manager.manager_id)
            {
                continue;
            }
            approvers.push(ApproverSlot::pending(
                manager.slot,
                manager.manager_id,
                manager.manager_name.clone(),
            ));
        }

        let status = if approvers.is_empty() {
            LeaveStatus::PendingHrApproval
        } else {
            LeaveStatus::PendingManagerApproval
        };

        let request = self
            .store
            .insert_request(NewLeaveRequest {
                series: new_series(),
                employee_id,
                employee_name: profile.name,
                leave_type: leave_type.type_name,
                leave_balance_before,
                from_date,
                to_date: input.to_date,
                half_day: input.half_day,
                total_leave_days,
                reason,
                status,
                approvers,
            })
            .await?;

        tracing::info!(
            request_id = request.id,
            series = %request.series,
            employee_id,
            leave_type = %request.leave_type,
            days = %request.total_leave_days,
            approvers = request.approvers.len(),
            status = %request.status,
            "Leave request submitted"
        );

        Ok(request)
    }

    async fn active_leave_type(&self, name: &str) -> Result<LeaveType, LeaveError> {
        if let Some(cached) = self.leave_types.get(name).await {
            return Ok(cached);
        }

        match self.store.leave_type_by_name(name).await? {
            Some(leave_type) if leave_type.is_active => {
                self.leave_types.insert(leave_type.clone()).await;
                Ok(leave_type)
            }
            Some(leave_type) => Err(LeaveError::validation(format!(
                "Leave type '{}' is no longer active",
                leave_type.type_name
            ))),
            None => Err(LeaveError::validation(format!(
                "Unknown leave type '{}'",
                name.trim()
            ))),
        }
    }

    // ---------------------------------------------------------------
    // Decisions
    // ---------------------------------------------------------------

    pub async fn manager_decide(
        &self,
        actor: &AuthUser,
        id: u64,
        input: DecisionInput,
    ) -> Result<LeaveRequest, LeaveError> {
        let manager_id = actor.employee_id.ok_or_else(|| {
            LeaveError::not_authorized("You are not an assigned approver for this leave request")
        })?;
        let notes = clean_notes(input.notes);
        let now = Utc::now();

        let request = self
            .store
            .update_request(id, |request| {
                approval::manager_decide(request, manager_id, input.action, notes, now)?;
                Ok(request.clone())
            })
            .await?;

        tracing::info!(
            request_id = id,
            manager_id,
            decision = ?input.action,
            status = %request.status,
            "Manager decision recorded"
        );

        Ok(request)
    }

    pub async fn hr_decide(
        &self,
        actor: &AuthUser,
        id: u64,
        input: DecisionInput,
    ) -> Result<LeaveRequest, LeaveError> {
        actor.require_hr_or_admin()?;
        let reviewer = reviewer(actor);
        let notes = clean_notes(input.notes);
        let now = Utc::now();

        let result = match input.action {
            Decision::Approve => {
                self.store
                    .update_request_with_ledger(id, |request, ledger| {
                        approval::hr_approve(request, ledger, &reviewer, notes, now)?;
                        Ok(request.clone())
                    })
                    .await
            }
            Decision::Reject => {
                self.store
                    .update_request(id, |request| {
                        approval::hr_reject(request, &reviewer, notes, now)?;
                        Ok(request.clone())
                    })
                    .await
            }
        };

        match result {
            Ok(request) => {
                tracing::info!(
                    request_id = id,
                    hr_id = reviewer.id,
                    employee_id = request.employee_id,
                    leave_type = %request.leave_type,
                    days = %request.total_leave_days,
                    status = %request.status,
                    "HR decision recorded"
                );
                Ok(request)
            }
            Err(e @ LeaveError::InsufficientBalance { .. }) => {
                tracing::warn!(request_id = id, hr_id = reviewer.id, error = %e, "HR approval refused");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn withdraw(&self, actor: &AuthUser, id: u64) -> Result<LeaveRequest, LeaveError> {
        let employee_id = actor.require_employee()?;
        let now = Utc::now();

        let request = self
            .store
            .update_request(id, |request| {
                approval::withdraw(request, employee_id, now)?;
                Ok(request.clone())
            })
            .await?;

        tracing::info!(request_id = id, employee_id, "Leave request withdrawn");
        Ok(request)
    }

    pub async fn cancel_approved(
        &self,
        actor: &AuthUser,
        id: u64,
        notes: Option<String>,
    ) -> Result<LeaveRequest, LeaveError> {
        actor.require_hr_or_admin()?;
        let notes = clean_notes(notes);
        let now = Utc::now();

        let request = self
            .store
            .update_request_with_ledger(id, |request, ledger| {
                approval::cancel_approved(request, ledger, notes, now)?;
                Ok(request.clone())
            })
            .await?;

        tracing::info!(
            request_id = id,
            hr_id = actor.user_id,
            employee_id = request.employee_id,
            restored = %request.total_leave_days,
            "Approved leave cancelled"
        );
        Ok(request)
    }

    // ---------------------------------------------------------------
    // Balances
    // ---------------------------------------------------------------

    pub async fn balance(
        &self,
        actor: &AuthUser,
        employee_id: u64,
        leave_type: &str,
        year: Option<i32>,
    ) -> Result<LeaveBalance, LeaveError> {
        ensure_can_view(actor, employee_id)?;
        if leave_type.trim().is_empty() {
            return Err(LeaveError::validation("leave_type is required"));
        }

        let year = year.unwrap_or_else(current_year);
        let type_name = self.canonical_type_name(leave_type).await?;

        let ledger = match LedgerScope::for_leave(employee_id, &type_name, year) {
            Some(scope) => self.store.ledger(&scope).await?,
            None => Ledger::default(),
        };

        Ok(LeaveBalance::new(employee_id, year, &type_name, ledger))
    }

    pub async fn balances_for_employee(
        &self,
        actor: &AuthUser,
        employee_id: u64,
        year: Option<i32>,
    ) -> Result<EmployeeBalances, LeaveError> {
        ensure_can_view(actor, employee_id)?;
        let year = year.unwrap_or_else(current_year);

        let leave_types = self
            .store
            .ledgers_for_employee(employee_id, year)
            .await?
            .into_iter()
            .map(|(name, ledger)| LeaveBalance::new(employee_id, year, &name, ledger))
            .collect();
        let comp_off = self
            .store
            .ledger(&LedgerScope::CompOff { employee_id, year })
            .await?;

        Ok(EmployeeBalances {
            employee_id,
            year,
            leave_types,
            comp_off,
        })
    }

    pub async fn allocate(
        &self,
        actor: &AuthUser,
        input: AllocateBalance,
    ) -> Result<LeaveBalance, LeaveError> {
        actor.require_hr_or_admin()?;

        let leave_type = self
            .store
            .leave_type_by_name(&input.leave_type)
            .await?
            .ok_or_else(|| {
                LeaveError::validation(format!("Unknown leave type '{}'", input.leave_type.trim()))
            })?;
        let year = input.year.unwrap_or_else(current_year);

        let scope = LedgerScope::for_leave(input.employee_id, &leave_type.type_name, year)
            .ok_or_else(|| {
                LeaveError::validation(format!(
                    "{} is not balance-tracked and cannot be allocated",
                    leave_type.type_name
                ))
            })?;

        let ledger = self
            .store
            .update_ledger(&scope, |ledger| {
                ledger.reallocate(input.total_allocated)?;
                Ok(*ledger)
            })
            .await?;

        tracing::info!(
            employee_id = input.employee_id,
            year,
            leave_type = %leave_type.type_name,
            allocated = %ledger.allocated(),
            hr_id = actor.user_id,
            "Leave balance allocated"
        );

        Ok(LeaveBalance::new(
            input.employee_id,
            year,
            scope.leave_type(),
            ledger,
        ))
    }

    pub async fn grant_comp_off(
        &self,
        actor: &AuthUser,
        input: GrantCompOff,
    ) -> Result<Ledger, LeaveError> {
        actor.require_hr_or_admin()?;

        if !input.days.is_positive() || !input.days.is_half_step() {
            return Err(LeaveError::validation(
                "Comp-off days must be a positive multiple of 0.5",
            ));
        }
        if input.days.exceeds_year() {
            return Err(LeaveError::validation(format!(
                "Comp-off grant cannot exceed {} days",
                Days::MAX_PER_YEAR
            )));
        }
        if self.store.employee_profile(input.employee_id).await?.is_none() {
            return Err(LeaveError::NotFound(format!(
                "Employee {} not found",
                input.employee_id
            )));
        }

        let year = input.year.unwrap_or_else(current_year);
        let scope = LedgerScope::CompOff {
            employee_id: input.employee_id,
            year,
        };

        let ledger = self
            .store
            .update_ledger(&scope, |ledger| {
                ledger.earn(input.days)?;
                Ok(*ledger)
            })
            .await?;

        tracing::info!(
            employee_id = input.employee_id,
            year,
            days = %input.days,
            reason = input.reason.as_deref().unwrap_or(""),
            hr_id = actor.user_id,
            "Comp-off granted"
        );

        Ok(ledger)
    }

    async fn canonical_type_name(&self, name: &str) -> Result<String, LeaveError> {
        Ok(match self.store.leave_type_by_name(name).await? {
            Some(leave_type) => leave_type.type_name,
            None => name.trim().to_string(),
        })
    }

    // ---------------------------------------------------------------
    // Read models
    // ---------------------------------------------------------------

    pub async fn requests_for_employee(
        &self,
        actor: &AuthUser,
        employee_id: u64,
    ) -> Result<Vec<LeaveRequest>, LeaveError> {
        ensure_can_view(actor, employee_id)?;

        let page = self
            .store
            .list_requests(&RequestQuery {
                employee_id: Some(employee_id),
                ..RequestQuery::default()
            })
            .await?;

        Ok(page.items)
    }

    pub async fn pending_for_manager(&self, actor: &AuthUser) -> Result<Vec<LeaveRequest>, LeaveError> {
        let manager_id = actor.require_employee()?;

        let page = self
            .store
            .list_requests(&RequestQuery {
                statuses: vec![LeaveStatus::PendingManagerApproval],
                pending_approver: Some(manager_id),
                oldest_first: true,
                ..RequestQuery::default()
            })
            .await?;

        Ok(page.items)
    }

    pub async fn pending_for_hr(&self, actor: &AuthUser) -> Result<Vec<LeaveRequest>, LeaveError> {
        actor.require_hr_or_admin()?;

        let page = self
            .store
            .list_requests(&RequestQuery {
                statuses: LeaveStatus::AWAITING_HR.to_vec(),
                oldest_first: true,
                ..RequestQuery::default()
            })
            .await?;

        Ok(page.items)
    }

    /// HR listing; `page` is 1-based.
    pub async fn list_requests(
        &self,
        actor: &AuthUser,
        employee_id: Option<u64>,
        status: Option<LeaveStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<RequestPage, LeaveError> {
        actor.require_hr_or_admin()?;

        let offset = page
            .saturating_sub(1)
            .checked_mul(per_page)
            .ok_or_else(|| LeaveError::validation("page out of range"))?;

        self.store
            .list_requests(&RequestQuery {
                employee_id,
                statuses: status.into_iter().collect(),
                pending_approver: None,
                oldest_first: false,
                limit: Some(per_page),
                offset,
            })
            .await
    }

    /// Visible to the owner, any assigned approver, and HR/Admin.
    pub async fn get_request(&self, actor: &AuthUser, id: u64) -> Result<LeaveRequest, LeaveError> {
        let request = self
            .store
            .request(id)
            .await?
            .ok_or_else(|| request_not_found(id))?;

        let is_party = actor.employee_id.is_some_and(|me| {
            request.employee_id == me || request.slot_for(me).is_some()
        });
        if !actor.role.is_hr() && !is_party {
            return Err(LeaveError::not_authorized(
                "You are not allowed to view this leave request",
            ));
        }

        Ok(request)
    }

    // ---------------------------------------------------------------
    // Leave types
    // ---------------------------------------------------------------

    pub async fn leave_types(
        &self,
        actor: &AuthUser,
        include_inactive: bool,
    ) -> Result<Vec<LeaveType>, LeaveError> {
        self.store
            .leave_types(include_inactive && actor.role.is_hr())
            .await
    }

    pub async fn create_leave_type(
        &self,
        actor: &AuthUser,
        input: LeaveTypeInput,
    ) -> Result<LeaveType, LeaveError> {
        actor.require_hr_or_admin()?;
        input.validate()?;

        let created = self.store.insert_leave_type(&input).await?;
        self.leave_types.invalidate_all();

        tracing::info!(
            leave_type_id = created.id,
            type_name = %created.type_name,
            rule = ?BalanceRule::for_leave_type(&created.type_name),
            "Leave type created"
        );
        Ok(created)
    }

    pub async fn update_leave_type(
        &self,
        actor: &AuthUser,
        id: u64,
        input: LeaveTypeInput,
    ) -> Result<LeaveType, LeaveError> {
        actor.require_hr_or_admin()?;
        input.validate()?;

        let updated = self.store.update_leave_type(id, &input).await?;
        self.leave_types.invalidate_all();

        tracing::info!(leave_type_id = id, type_name = %updated.type_name, "Leave type updated");
        Ok(updated)
    }

    pub async fn deactivate_leave_type(
        &self,
        actor: &AuthUser,
        id: u64,
    ) -> Result<LeaveType, LeaveError> {
        actor.require_hr_or_admin()?;

        let deactivated = self.store.deactivate_leave_type(id).await?;
        self.leave_types.invalidate_all();

        tracing::info!(leave_type_id = id, type_name = %deactivated.type_name, "Leave type deactivated");
        Ok(deactivated)
    }
}

fn ensure_can_view(actor: &AuthUser, employee_id: u64) -> Result<(), LeaveError> {
    if actor.can_view_employee(employee_id) {
        Ok(())
    } else {
        Err(LeaveError::not_authorized(
            "You can only view your own leave information",
        ))
    }
}

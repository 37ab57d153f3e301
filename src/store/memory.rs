//! In-process store used by the engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::{
    error::LeaveError,
    model::{
        balance::{Ledger, LedgerScope},
        days::Days,
        leave_request::{EmployeeProfile, LeaveRequest, ManagerAssignment, NewLeaveRequest},
        leave_status::SlotStatus,
        leave_type::{LeaveType, LeaveTypeInput},
    },
    store::{
        LeaveStore, RequestPage, RequestQuery, duplicate_leave_type, leave_type_not_found,
        request_not_found,
    },
};

#[derive(Clone, Default)]
struct State {
    leave_types: Vec<LeaveType>,
    employees: HashMap<u64, EmployeeProfile>,
    ledgers: HashMap<LedgerScope, Ledger>,
    requests: Vec<LeaveRequest>,
}

/// Mutations work on a copy of the state that is swapped in only on success,
/// which gives the same all-or-nothing outcome as a rolled back transaction.
#[derive(Default)]
pub struct MemoryLeaveStore {
    state: Mutex<State>,
}

impl MemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employee(self, employee_id: u64, name: &str, managers: &[(u64, &str)]) -> Self {
        let profile = EmployeeProfile {
            employee_id,
            name: name.to_string(),
            managers: managers
                .iter()
                .enumerate()
                .map(|(i, (manager_id, manager_name))| ManagerAssignment {
                    slot: i as u8 + 1,
                    manager_id: *manager_id,
                    manager_name: manager_name.to_string(),
                })
                .collect(),
        };
        self.lock().employees.insert(employee_id, profile);
        self
    }

    pub fn with_leave_type(self, type_name: &str, max_days: Option<i64>) -> Self {
        {
            let mut state = self.lock();
            let id = state.leave_types.len() as u64 + 1;
            state.leave_types.push(LeaveType {
                id,
                type_name: type_name.to_string(),
                description: None,
                color: None,
                max_days: max_days.map(Days::whole),
                carry_forward: false,
                is_active: true,
            });
        }
        self
    }

    pub fn with_ledger(self, scope: LedgerScope, allocated: Days, used: Days) -> Self {
        self.lock().ledgers.insert(scope, Ledger::new(allocated, used));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transact<T>(&self, apply: impl FnOnce(&mut State) -> Result<T, LeaveError>) -> Result<T, LeaveError> {
        let mut guard = self.lock();
        let mut draft = guard.clone();
        let out = apply(&mut draft)?;
        *guard = draft;
        Ok(out)
    }
}

fn name_taken(state: &State, name: &str, except_id: Option<u64>) -> bool {
    state
        .leave_types
        .iter()
        .any(|t| Some(t.id) != except_id && t.type_name.eq_ignore_ascii_case(name.trim()))
}

impl LeaveStore for MemoryLeaveStore {
    async fn leave_types(&self, include_inactive: bool) -> Result<Vec<LeaveType>, LeaveError> {
        let mut types: Vec<LeaveType> = self
            .lock()
            .leave_types
            .iter()
            .filter(|t| include_inactive || t.is_active)
            .cloned()
            .collect();
        types.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        Ok(types)
    }

    async fn leave_type_by_name(&self, name: &str) -> Result<Option<LeaveType>, LeaveError> {
        Ok(self
            .lock()
            .leave_types
            .iter()
            .find(|t| t.type_name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn insert_leave_type(&self, input: &LeaveTypeInput) -> Result<LeaveType, LeaveError> {
        self.transact(|state| {
            let name = input.type_name.trim();
            if name_taken(state, name, None) {
                return Err(duplicate_leave_type(name));
            }
            let created = LeaveType {
                id: state.leave_types.iter().map(|t| t.id).max().unwrap_or(0) + 1,
                type_name: name.to_string(),
                description: input.description.clone(),
                color: Some(input.color_or_default()),
                max_days: input.max_days,
                carry_forward: input.carry_forward,
                is_active: true,
            };
            state.leave_types.push(created.clone());
            Ok(created)
        })
    }

    async fn update_leave_type(
        &self,
        id: u64,
        input: &LeaveTypeInput,
    ) -> Result<LeaveType, LeaveError> {
        self.transact(|state| {
            let name = input.type_name.trim();
            if name_taken(state, name, Some(id)) {
                return Err(duplicate_leave_type(name));
            }
            let existing = state
                .leave_types
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| leave_type_not_found(id))?;
            existing.type_name = name.to_string();
            existing.description = input.description.clone();
            existing.color = Some(input.color_or_default());
            existing.max_days = input.max_days;
            existing.carry_forward = input.carry_forward;
            existing.is_active = input.is_active.unwrap_or(existing.is_active);
            Ok(existing.clone())
        })
    }

    async fn deactivate_leave_type(&self, id: u64) -> Result<LeaveType, LeaveError> {
        self.transact(|state| {
            let existing = state
                .leave_types
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| leave_type_not_found(id))?;
            existing.is_active = false;
            Ok(existing.clone())
        })
    }

    async fn employee_profile(
        &self,
        employee_id: u64,
    ) -> Result<Option<EmployeeProfile>, LeaveError> {
        Ok(self.lock().employees.get(&employee_id).cloned())
    }

    async fn ledger(&self, scope: &LedgerScope) -> Result<Ledger, LeaveError> {
        Ok(self.lock().ledgers.get(scope).copied().unwrap_or_default())
    }

    async fn ledgers_for_employee(
        &self,
        employee_id: u64,
        year: i32,
    ) -> Result<Vec<(String, Ledger)>, LeaveError> {
        let mut ledgers: Vec<(String, Ledger)> = self
            .lock()
            .ledgers
            .iter()
            .filter_map(|(scope, ledger)| match scope {
                LedgerScope::LeaveType {
                    employee_id: e,
                    year: y,
                    leave_type,
                } if *e == employee_id && *y == year => Some((leave_type.clone(), *ledger)),
                _ => None,
            })
            .collect();
        ledgers.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ledgers)
    }

    async fn update_ledger<F, T>(&self, scope: &LedgerScope, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, LeaveError>,
    {
        self.transact(|state| {
            let ledger = state.ledgers.entry(scope.clone()).or_default();
            apply(ledger)
        })
    }

    async fn insert_request(&self, request: NewLeaveRequest) -> Result<LeaveRequest, LeaveError> {
        self.transact(|state| {
            let id = state.requests.len() as u64 + 1;
            let created = request.into_request(id, Utc::now());
            state.requests.push(created.clone());
            Ok(created)
        })
    }

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        Ok(self.lock().requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(&self, query: &RequestQuery) -> Result<RequestPage, LeaveError> {
        let state = self.lock();
        let mut matching: Vec<LeaveRequest> = state
            .requests
            .iter()
            .filter(|r| query.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| query.statuses.is_empty() || query.statuses.contains(&r.status))
            .filter(|r| {
                query.pending_approver.is_none_or(|manager_id| {
                    r.slot_for(manager_id)
                        .is_some_and(|s| s.status == SlotStatus::Pending)
                })
            })
            .cloned()
            .collect();

        // ids grow with insertion order
        matching.sort_by_key(|r| r.id);
        if !query.oldest_first {
            matching.reverse();
        }

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit.map_or(usize::MAX, |l| l as usize))
            .collect();

        Ok(RequestPage { items, total })
    }

    async fn update_request<F, T>(&self, id: u64, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut LeaveRequest) -> Result<T, LeaveError>,
    {
        self.transact(|state| {
            let request = state
                .requests
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| request_not_found(id))?;
            apply(request)
        })
    }

    async fn update_request_with_ledger<F, T>(&self, id: u64, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut LeaveRequest, Option<&mut Ledger>) -> Result<T, LeaveError>,
    {
        self.transact(|state| {
            let request = state
                .requests
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| request_not_found(id))?;
            let scope =
                LedgerScope::for_leave(request.employee_id, &request.leave_type, request.year());
            let ledger = match scope {
                Some(scope) => Some(state.ledgers.entry(scope).or_default()),
                None => None,
            };
            apply(request, ledger)
        })
    }
}

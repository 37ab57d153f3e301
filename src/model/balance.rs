use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::LeaveError,
    model::{
        days::Days,
        leave_type::{BalanceRule, COMP_OFF},
    },
};

/// Allocated/used/remaining counters for one balance scope.
///
/// `remaining` is always `allocated - used` and never drops below zero:
/// deductions are checked against it and reallocation below `used` is refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Ledger {
    #[schema(value_type = f64, example = 15)]
    allocated: Days,
    #[schema(value_type = f64, example = 3)]
    used: Days,
    #[schema(value_type = f64, example = 12)]
    remaining: Days,
}

impl Ledger {
    pub fn new(allocated: Days, used: Days) -> Self {
        Ledger {
            allocated,
            used,
            remaining: allocated - used,
        }
    }

    pub fn allocated(&self) -> Days {
        self.allocated
    }

    pub fn used(&self) -> Days {
        self.used
    }

    pub fn remaining(&self) -> Days {
        self.remaining
    }

    pub fn ensure_covers(&self, days: Days) -> Result<(), LeaveError> {
        if days > self.remaining {
            return Err(LeaveError::InsufficientBalance {
                remaining: self.remaining,
                requested: days,
            });
        }
        Ok(())
    }

    pub fn deduct(&mut self, days: Days) -> Result<(), LeaveError> {
        self.ensure_covers(days)?;
        self.used += days;
        self.remaining = self.allocated - self.used;
        Ok(())
    }

    /// Reverse an earlier deduction. `used` is clamped at zero.
    pub fn restore(&mut self, days: Days) {
        self.used = if days > self.used {
            Days::ZERO
        } else {
            self.used - days
        };
        self.remaining = self.allocated - self.used;
    }

    pub fn reallocate(&mut self, allocated: Days) -> Result<(), LeaveError> {
        if allocated.is_negative() {
            return Err(LeaveError::validation("Allocation cannot be negative"));
        }
        if allocated.exceeds_year() {
            return Err(LeaveError::validation(format!(
                "Allocation cannot exceed {} days",
                Days::MAX_PER_YEAR
            )));
        }
        if allocated < self.used {
            return Err(LeaveError::validation(format!(
                "Allocation of {allocated} is below the {} days already used",
                self.used
            )));
        }
        self.allocated = allocated;
        self.remaining = self.allocated - self.used;
        Ok(())
    }

    /// Credit earned days (comp-off). The yearly total stays within
    /// [`Days::MAX_PER_YEAR`].
    pub fn earn(&mut self, days: Days) -> Result<(), LeaveError> {
        let allocated = self
            .allocated
            .checked_add(days)
            .filter(|total| !total.exceeds_year())
            .ok_or_else(|| {
                LeaveError::validation(format!(
                    "Earned days cannot exceed {} in a year",
                    Days::MAX_PER_YEAR
                ))
            })?;
        self.allocated = allocated;
        self.remaining = self.allocated - self.used;
        Ok(())
    }
}

/// Identifies the ledger a leave type draws from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerScope {
    LeaveType {
        employee_id: u64,
        year: i32,
        leave_type: String,
    },
    CompOff {
        employee_id: u64,
        year: i32,
    },
}

impl LedgerScope {
    /// `None` for leave types that never touch a balance.
    pub fn for_leave(employee_id: u64, leave_type: &str, year: i32) -> Option<Self> {
        match BalanceRule::for_leave_type(leave_type) {
            BalanceRule::Tracked => Some(LedgerScope::LeaveType {
                employee_id,
                year,
                leave_type: leave_type.trim().to_string(),
            }),
            BalanceRule::CompOff => Some(LedgerScope::CompOff { employee_id, year }),
            BalanceRule::Unrestricted => None,
        }
    }

    pub fn leave_type(&self) -> &str {
        match self {
            LedgerScope::LeaveType { leave_type, .. } => leave_type,
            LedgerScope::CompOff { .. } => COMP_OFF,
        }
    }
}

/// Balance answer for one employee, leave type and year.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveBalance {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = "Sick Leave")]
    pub leave_type: String,
    pub rule: BalanceRule,
    #[schema(value_type = f64, example = 6)]
    pub allocated: Days,
    #[schema(value_type = f64, example = 1)]
    pub used: Days,
    #[schema(value_type = f64, example = 5)]
    pub remaining: Days,
}

impl LeaveBalance {
    pub fn new(employee_id: u64, year: i32, leave_type: &str, ledger: Ledger) -> Self {
        LeaveBalance {
            employee_id,
            year,
            leave_type: leave_type.to_string(),
            rule: BalanceRule::for_leave_type(leave_type),
            allocated: ledger.allocated(),
            used: ledger.used(),
            remaining: ledger.remaining(),
        }
    }
}

/// Every ledger an employee holds for a year.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeeBalances {
    pub employee_id: u64,
    pub year: i32,
    pub leave_types: Vec<LeaveBalance>,
    pub comp_off: Ledger,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(allocated: i64, used: i64) -> Ledger {
        Ledger::new(Days::whole(allocated), Days::whole(used))
    }

    fn holds_invariant(l: &Ledger) -> bool {
        l.remaining() == l.allocated() - l.used() && !l.used().is_negative()
    }

    #[test]
    fn deduct_within_balance() {
        let mut l = ledger(5, 0);
        l.deduct(Days::whole(3)).unwrap();
        assert_eq!(l.remaining(), Days::whole(2));
        assert_eq!(l.used(), Days::whole(3));
        assert!(holds_invariant(&l));
    }

    #[test]
    fn deduct_beyond_balance_leaves_ledger_untouched() {
        let mut l = ledger(5, 3);
        let err = l.deduct(Days::whole(3)).unwrap_err();
        match err {
            LeaveError::InsufficientBalance { remaining, requested } => {
                assert_eq!(remaining, Days::whole(2));
                assert_eq!(requested, Days::whole(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(l, ledger(5, 3));
    }

    #[test]
    fn half_days_do_not_drift() {
        let mut l = ledger(1, 0);
        l.deduct(Days::HALF).unwrap();
        l.deduct(Days::HALF).unwrap();
        assert_eq!(l.remaining(), Days::ZERO);
        assert!(l.deduct(Days::HALF).is_err());
    }

    #[test]
    fn restore_reverses_deduction_and_clamps() {
        let mut l = ledger(10, 0);
        l.deduct(Days::whole(4)).unwrap();
        l.restore(Days::whole(4));
        assert_eq!(l, ledger(10, 0));

        l.restore(Days::whole(2));
        assert_eq!(l.used(), Days::ZERO);
        assert!(holds_invariant(&l));
    }

    #[test]
    fn reallocate_respects_used_floor() {
        let mut l = ledger(10, 4);
        assert!(l.reallocate(Days::whole(3)).is_err());
        assert!(l.reallocate(Days::whole(-1)).is_err());
        assert!(l.reallocate(Days::whole(367)).is_err());
        l.reallocate(Days::whole(6)).unwrap();
        assert_eq!(l.remaining(), Days::whole(2));
        assert!(holds_invariant(&l));
    }

    #[test]
    fn earn_stops_at_yearly_cap() {
        let mut l = ledger(360, 2);
        l.earn(Days::whole(6)).unwrap();
        assert_eq!(l.remaining(), Days::whole(364));

        let err = l.earn(Days::HALF).unwrap_err();
        assert!(matches!(err, LeaveError::Validation(_)));
        assert_eq!(l, ledger(366, 2));
    }

    #[test]
    fn scope_follows_balance_rule() {
        assert!(LedgerScope::for_leave(1, "Unpaid Leave", 2024).is_none());
        assert_eq!(
            LedgerScope::for_leave(1, "Comp Off", 2024),
            Some(LedgerScope::CompOff { employee_id: 1, year: 2024 })
        );
        let scope = LedgerScope::for_leave(1, "Sick Leave", 2024).unwrap();
        assert_eq!(scope.leave_type(), "Sick Leave");
    }
}

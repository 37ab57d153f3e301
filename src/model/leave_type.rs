use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::LeaveError, model::days::Days};

pub const UNPAID_LEAVE: &str = "Unpaid Leave";
pub const COMP_OFF: &str = "Comp Off";
pub const DEFAULT_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "type_name": "Sick Leave",
    "description": "Illness or medical appointments",
    "color": "#3B82F6",
    "max_days": 6,
    "carry_forward": false,
    "is_active": true
}))]
pub struct LeaveType {
    pub id: u64,
    pub type_name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    /// Cap on days per year, if any
    #[schema(value_type = Option<f64>)]
    pub max_days: Option<Days>,
    pub carry_forward: bool,
    pub is_active: bool,
}

/// HR payload for creating or editing a leave type.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveTypeInput {
    #[schema(example = "Sick Leave")]
    pub type_name: String,
    #[schema(example = "Illness or medical appointments")]
    pub description: Option<String>,
    #[schema(example = "#3B82F6")]
    pub color: Option<String>,
    #[schema(example = 6, value_type = Option<f64>)]
    pub max_days: Option<Days>,
    #[serde(default)]
    pub carry_forward: bool,
    /// Defaults to active; ignored on create
    pub is_active: Option<bool>,
}

impl LeaveTypeInput {
    pub fn validate(&self) -> Result<(), LeaveError> {
        if self.type_name.trim().is_empty() {
            return Err(LeaveError::validation("Leave type name is required"));
        }
        if let Some(max) = self.max_days {
            if !max.is_positive() {
                return Err(LeaveError::validation("max_days must be greater than zero"));
            }
        }
        if let Some(color) = &self.color {
            let hex = color.strip_prefix('#').unwrap_or_default();
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(LeaveError::validation(format!(
                    "color must look like {DEFAULT_COLOR}, got {color}"
                )));
            }
        }
        Ok(())
    }

    pub fn color_or_default(&self) -> String {
        self.color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string())
    }
}

/// Which balance, if any, a leave type draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BalanceRule {
    /// Checked against the type's own per-year ledger.
    Tracked,
    /// Checked against the employee's comp-off ledger.
    CompOff,
    /// Never checked, never deducted.
    Unrestricted,
}

impl BalanceRule {
    pub fn for_leave_type(type_name: &str) -> Self {
        let name = type_name.trim();
        if name.eq_ignore_ascii_case(UNPAID_LEAVE) {
            BalanceRule::Unrestricted
        } else if name.eq_ignore_ascii_case(COMP_OFF) {
            BalanceRule::CompOff
        } else {
            BalanceRule::Tracked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> LeaveTypeInput {
        LeaveTypeInput {
            type_name: name.to_string(),
            description: None,
            color: None,
            max_days: None,
            carry_forward: false,
            is_active: None,
        }
    }

    #[test]
    fn balance_rule_by_name() {
        assert_eq!(BalanceRule::for_leave_type("Unpaid Leave"), BalanceRule::Unrestricted);
        assert_eq!(BalanceRule::for_leave_type("unpaid leave "), BalanceRule::Unrestricted);
        assert_eq!(BalanceRule::for_leave_type("Comp Off"), BalanceRule::CompOff);
        assert_eq!(BalanceRule::for_leave_type("Sick Leave"), BalanceRule::Tracked);
    }

    #[test]
    fn validates_name_and_color() {
        assert!(input("Sick Leave").validate().is_ok());
        assert!(input("  ").validate().is_err());

        let mut bad_color = input("Sick Leave");
        bad_color.color = Some("blue".to_string());
        assert!(bad_color.validate().is_err());

        let mut zero_cap = input("Sick Leave");
        zero_cap.max_days = Some(Days::ZERO);
        assert!(zero_cap.validate().is_err());
    }

    #[test]
    fn default_color_applies() {
        assert_eq!(input("Casual Leave").color_or_default(), DEFAULT_COLOR);
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    Manager = 4,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::Manager),
            _ => None,
        }
    }

    /// HR decisions, allocations and leave-type edits
    pub fn is_hr(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

pub mod balance;
pub mod leave_request;
pub mod leave_type;

use crate::{engine::LeaveEngine, store::mysql::MySqlLeaveStore};

/// The engine as wired into the running server.
pub type AppEngine = LeaveEngine<MySqlLeaveStore>;

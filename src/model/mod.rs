pub mod balance;
pub mod days;
pub mod leave_request;
pub mod leave_status;
pub mod leave_type;
pub mod role;

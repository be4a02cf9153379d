pub mod auth_cmd;
pub mod cabinet;
pub mod common;
pub mod log;
pub mod profile;
pub mod program;
pub mod sync_cmd;

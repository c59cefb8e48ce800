//! Process-level orchestration: startup, shutdown triggers and teardown.

mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::{RunningService, run_service, start_service};
pub use shutdown::ShutdownReason;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

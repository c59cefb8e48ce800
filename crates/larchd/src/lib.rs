//! The larch session service.
//!
//! `larchd` binds the configured endpoint and answers newline-delimited
//! JSON-RPC 2.0 calls: the `system.listMethods` compatibility probe, the
//! client identity record, the keepalive window and a remote `shutdown`. It
//! exits when asked to, when it receives a termination signal, or when no
//! client activity has arrived within the keepalive window.
//!
//! Lifecycle events are surfaced through [`HealthReporter`] so operators can
//! follow startup, client registration and shutdown in structured logs.

mod dispatch;
mod health;
mod keepalive;
mod process;
mod session;
mod transport;

#[cfg(test)]
mod tests;

pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, RunningService, ShutdownReason, run_service, start_service};
pub use transport::ListenerError;

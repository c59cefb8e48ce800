//! Lifecycle management for `larchd` instances.
//!
//! The module is split into focused submodules:
//! - [`types`] defines the command models, liveness states and IO helpers.
//! - [`error`] captures the error surface exposed to the CLI.
//! - [`probe`] classifies an endpoint with the compatibility probe.
//! - [`spawning`] launches detached service processes.
//! - [`report`] derives the keepalive summary printed by `report`.
//! - [`controller`] implements the start/stop/restart/next/status/report flows.

mod controller;
mod error;
mod probe;
mod report;
mod spawning;
mod types;

/// Tracing target for lifecycle events.
pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

pub use controller::{Controller, ControllerSettings};
pub use error::LifecycleError;
pub use report::{ClientReport, RemainingTime, TimeUnit};
pub use spawning::{DetachedServer, ProcessLauncher, ServerLauncher};
pub use types::{
    LifecycleCommand, LifecycleContext, LifecycleInvocation, LifecycleOutput, LivenessState,
};

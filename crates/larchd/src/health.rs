//! Structured health reporting for service lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use larch_protocol::ClientIdentity;

use crate::process::{LaunchError, ShutdownReason};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked once the listener is accepting connections.
    fn service_ready(&self, address: SocketAddr, keepalive_secs: f64);

    /// Invoked when a client records its identity.
    fn client_registered(&self, identity: &ClientIdentity);

    /// Invoked when a client replaces the keepalive window.
    fn keepalive_changed(&self, seconds: f64);

    /// Invoked when a shutdown reason has been received.
    fn shutdown_requested(&self, reason: ShutdownReason);

    /// Invoked after the listener has stopped.
    fn service_stopped(&self);

    /// Invoked when the service fails to start or stop cleanly.
    fn service_failed(&self, error: &LaunchError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn service_ready(&self, address: SocketAddr, keepalive_secs: f64) {
        (**self).service_ready(address, keepalive_secs);
    }

    fn client_registered(&self, identity: &ClientIdentity) {
        (**self).client_registered(identity);
    }

    fn keepalive_changed(&self, seconds: f64) {
        (**self).keepalive_changed(seconds);
    }

    fn shutdown_requested(&self, reason: ShutdownReason) {
        (**self).shutdown_requested(reason);
    }

    fn service_stopped(&self) {
        (**self).service_stopped();
    }

    fn service_failed(&self, error: &LaunchError) {
        (**self).service_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn service_ready(&self, address: SocketAddr, keepalive_secs: f64) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_ready",
            %address,
            keepalive_secs,
            pid = std::process::id(),
            "larchd accepting connections"
        );
    }

    fn client_registered(&self, identity: &ClientIdentity) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "client_registered",
            client_pid = identity.pid,
            app = %identity.app,
            machine = %identity.machine,
            user = %identity.user,
            "client identity recorded"
        );
    }

    fn keepalive_changed(&self, seconds: f64) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "keepalive_changed",
            seconds,
            "keepalive window updated"
        );
    }

    fn shutdown_requested(&self, reason: ShutdownReason) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_requested",
            %reason,
            "shutdown requested"
        );
    }

    fn service_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_stopped",
            "larchd stopped"
        );
    }

    fn service_failed(&self, error: &LaunchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "service_failed",
            error = %error,
            "larchd failed"
        );
    }
}

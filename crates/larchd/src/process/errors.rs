//! Defines the unified error surface for service launch and supervision.

use std::sync::Arc;

use larch_config::telemetry::TelemetryError;
use ortho_config::OrthoError;
use thiserror::Error;

use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the service.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// Binding or running the listener failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// Installing the shutdown signal handlers failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// The keepalive monitor thread panicked.
    #[error("keepalive monitor thread panicked")]
    MonitorPanic,
}

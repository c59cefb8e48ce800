//! Error types for service lifecycle operations.

use std::ffi::OsString;
use std::io;

use thiserror::Error;

use super::LivenessState;
use crate::transport::HandleError;

/// Errors raised while executing lifecycle commands.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{endpoint} is in use by a process that is not larch_server")]
    IncompatibleService { endpoint: String },
    #[error("no larch_server running on {endpoint} ({state})")]
    NotRunning {
        endpoint: String,
        state: LivenessState,
    },
    #[error("cannot start larch_server on {endpoint}: port is {state}")]
    PortBusy {
        endpoint: String,
        state: LivenessState,
    },
    #[error("call to '{method}' on {endpoint} failed: {source}")]
    RemoteCall {
        endpoint: String,
        method: &'static str,
        #[source]
        source: HandleError,
    },
    #[error("failed to spawn server binary '{binary:?}': {source}")]
    LaunchServer {
        binary: OsString,
        #[source]
        source: io::Error,
    },
    #[error("no free port at or above {from}")]
    NoAvailablePort { from: u16 },
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}

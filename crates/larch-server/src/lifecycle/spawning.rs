//! Service process spawning.
//!
//! Resolves the `larchd` binary and launches it detached from the controller:
//! null stdio, its own process group on Unix, and no retained child handle.

use std::env;
use std::ffi::{OsStr, OsString};
use std::process::{Command, Stdio};

use larch_config::ServiceEndpoint;
use tracing::debug;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;

/// Environment variable naming the service binary.
pub const SERVER_BINARY_ENV: &str = "LARCHD_BIN";
const DEFAULT_SERVER_BINARY: &str = "larchd";

/// A launched service the controller no longer owns.
///
/// Only the pid and endpoint are kept; the process cannot be signalled or
/// reaped through this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedServer {
    pub pid: u32,
    pub endpoint: ServiceEndpoint,
}

/// Seam over process creation so lifecycle flows can be tested without one.
pub trait ServerLauncher {
    /// Launches a service bound to `endpoint` and returns without waiting.
    fn launch(&self, endpoint: &ServiceEndpoint) -> Result<DetachedServer, LifecycleError>;
}

/// Launches `larchd` as a detached child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    binary: OsString,
    forwarded_args: Vec<OsString>,
}

impl ProcessLauncher {
    /// Uses `binary_override`, then `LARCHD_BIN`, then `larchd` on `PATH`.
    ///
    /// `forwarded_args` are passed to the service ahead of `--host`/`--port`.
    #[must_use]
    pub fn new(binary_override: Option<&OsStr>, forwarded_args: Vec<OsString>) -> Self {
        Self {
            binary: resolve_server_binary(binary_override),
            forwarded_args,
        }
    }
}

impl ServerLauncher for ProcessLauncher {
    fn launch(&self, endpoint: &ServiceEndpoint) -> Result<DetachedServer, LifecycleError> {
        let mut command = Command::new(&self.binary);
        command
            .args(&self.forwarded_args)
            .arg("--host")
            .arg(endpoint.host())
            .arg("--port")
            .arg(endpoint.port().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);
        let child = command
            .spawn()
            .map_err(|source| LifecycleError::LaunchServer {
                binary: self.binary.clone(),
                source,
            })?;
        let pid = child.id();
        // Dropping the handle neither kills nor waits for the process.
        drop(child);
        debug!(
            target: LIFECYCLE_TARGET,
            pid,
            %endpoint,
            binary = ?self.binary,
            "launched detached server"
        );
        Ok(DetachedServer {
            pid,
            endpoint: endpoint.clone(),
        })
    }
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

fn resolve_server_binary(binary_override: Option<&OsStr>) -> OsString {
    binary_override
        .map(OsString::from)
        .or_else(|| env::var_os(SERVER_BINARY_ENV))
        .unwrap_or_else(|| OsString::from(DEFAULT_SERVER_BINARY))
}

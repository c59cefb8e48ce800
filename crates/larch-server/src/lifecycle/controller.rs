//! High-level orchestration for lifecycle commands.
//!
//! [`Controller`] exposes the library operations (probe, start, stop,
//! restart, next_available, report) and [`Controller::handle`] maps a CLI
//! invocation onto them. Every command classifies the endpoint once at
//! dispatch; `restart` classifies it a second time after the settle delay.

use std::io::Write;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, SystemTime};

use larch_config::{Config, ServiceEndpoint};
use larch_protocol::methods;
use tracing::debug;

use super::error::LifecycleError;
use super::probe::probe_endpoint;
use super::report::ClientReport;
use super::spawning::{DetachedServer, ProcessLauncher, ServerLauncher};
use super::types::{
    LifecycleCommand, LifecycleContext, LifecycleInvocation, LifecycleOutput, LivenessState,
};
use super::LIFECYCLE_TARGET;
use crate::transport::ServiceHandle;

const STATUS_FOREIGN_EXIT: u8 = 2;

/// Timing knobs for lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Timeout for each connect and read against the endpoint.
    pub probe_timeout: Duration,
    /// Pause between stopping and re-probing during a restart.
    pub settle_delay: Duration,
}

impl ControllerSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            probe_timeout: config.probe_timeout(),
            settle_delay: config.settle_delay(),
        }
    }
}

/// Lifecycle controller for `larchd` instances.
#[derive(Debug)]
pub struct Controller<L = ProcessLauncher> {
    launcher: L,
    settings: ControllerSettings,
}

impl Controller<ProcessLauncher> {
    /// Builds the production controller, forwarding configuration flags to
    /// spawned services.
    #[must_use]
    pub fn from_context(context: LifecycleContext<'_>) -> Self {
        let forwarded = context.forwarded_flags.to_vec();
        Self::new(
            ProcessLauncher::new(context.server_binary, forwarded),
            ControllerSettings::from_config(context.config),
        )
    }
}

impl<L: ServerLauncher> Controller<L> {
    #[must_use]
    pub fn new(launcher: L, settings: ControllerSettings) -> Self {
        Self { launcher, settings }
    }

    /// Classifies `endpoint`.
    #[must_use]
    pub fn probe(&self, endpoint: &ServiceEndpoint) -> LivenessState {
        probe_endpoint(endpoint, self.settings.probe_timeout)
    }

    /// Launches a detached service on `endpoint` without checking the port.
    pub fn start(&self, endpoint: &ServiceEndpoint) -> Result<DetachedServer, LifecycleError> {
        self.launcher.launch(endpoint)
    }

    /// Asks the service on `endpoint` to shut down.
    ///
    /// Fails with [`LifecycleError::NotRunning`] unless the endpoint is
    /// connected. Returns once the service acknowledges; it does not wait for
    /// the process to exit.
    pub fn stop(&self, endpoint: &ServiceEndpoint) -> Result<(), LifecycleError> {
        match self.probe(endpoint) {
            LivenessState::Connected => self.request_shutdown(endpoint),
            state => Err(LifecycleError::NotRunning {
                endpoint: endpoint.to_string(),
                state,
            }),
        }
    }

    /// Stops any service on `endpoint`, waits the settle delay and starts a
    /// new one.
    ///
    /// Another process can claim the port during the settle delay; that case
    /// surfaces as [`LifecycleError::PortBusy`].
    pub fn restart(&self, endpoint: &ServiceEndpoint) -> Result<DetachedServer, LifecycleError> {
        let state = self.probe(endpoint);
        self.restart_from(state, endpoint)
    }

    /// First port at or above `endpoint`'s port with nothing listening.
    pub fn next_available(&self, endpoint: &ServiceEndpoint) -> Result<u16, LifecycleError> {
        let from = endpoint.port();
        self.first_free(endpoint, from.max(1))
            .ok_or(LifecycleError::NoAvailablePort { from })
    }

    /// Fetches the session record and derives the time left before expiry.
    pub fn report(&self, endpoint: &ServiceEndpoint) -> Result<ClientReport, LifecycleError> {
        let info = self
            .handle_for(endpoint)
            .client_info()
            .map_err(|source| LifecycleError::RemoteCall {
                endpoint: endpoint.to_string(),
                method: methods::GET_CLIENT_INFO,
                source,
            })?;
        Ok(ClientReport::new(endpoint.clone(), info, SystemTime::now()))
    }

    /// Runs one CLI command and maps the outcome to an exit code.
    pub fn handle<W: Write, E: Write>(
        &self,
        invocation: LifecycleInvocation,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let endpoint = &invocation.endpoint;
        let state = self.probe(endpoint);
        debug!(
            target: LIFECYCLE_TARGET,
            command = %invocation.command,
            %endpoint,
            %state,
            "dispatching lifecycle command"
        );
        match invocation.command {
            LifecycleCommand::Status => Self::handle_status(state, endpoint, output),
            LifecycleCommand::Start => self.handle_start(state, endpoint, output),
            LifecycleCommand::Stop => self.handle_stop(state, endpoint, output),
            LifecycleCommand::Restart => self.handle_restart(state, endpoint, output),
            LifecycleCommand::Next => self.handle_next(state, endpoint, output),
            LifecycleCommand::Report => self.handle_report(state, endpoint, output),
        }
    }

    fn handle_status<W: Write, E: Write>(
        state: LivenessState,
        endpoint: &ServiceEndpoint,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        match state {
            LivenessState::Connected => {
                output.stdout_line(format_args!("larch_server running on {endpoint}"))?;
                Ok(ExitCode::SUCCESS)
            }
            LivenessState::NotInUse => {
                output.stdout_line(format_args!("larch_server not running on {endpoint}"))?;
                Ok(ExitCode::FAILURE)
            }
            LivenessState::NotLarchServer => {
                output.stdout_line(format_args!(
                    "{endpoint} is in use by a process that is not larch_server"
                ))?;
                Ok(ExitCode::from(STATUS_FOREIGN_EXIT))
            }
        }
    }

    fn handle_start<W: Write, E: Write>(
        &self,
        state: LivenessState,
        endpoint: &ServiceEndpoint,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        match state {
            LivenessState::Connected => {
                output.stdout_line(format_args!("larch_server already running on {endpoint}"))?;
                Ok(ExitCode::SUCCESS)
            }
            LivenessState::NotInUse => {
                let server = self.start(endpoint)?;
                write_started(output, &server)?;
                Ok(ExitCode::SUCCESS)
            }
            LivenessState::NotLarchServer => Err(incompatible(endpoint)),
        }
    }

    fn handle_stop<W: Write, E: Write>(
        &self,
        state: LivenessState,
        endpoint: &ServiceEndpoint,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        match state {
            LivenessState::Connected => {
                self.request_shutdown(endpoint)?;
                output.stdout_line(format_args!("larch_server on {endpoint} shutting down"))?;
                Ok(ExitCode::SUCCESS)
            }
            LivenessState::NotInUse => {
                output.stdout_line(format_args!("larch_server not running on {endpoint}"))?;
                Ok(ExitCode::SUCCESS)
            }
            LivenessState::NotLarchServer => Err(incompatible(endpoint)),
        }
    }

    fn handle_restart<W: Write, E: Write>(
        &self,
        state: LivenessState,
        endpoint: &ServiceEndpoint,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        if self.shutdown_if_connected(state, endpoint)? {
            output.stdout_line(format_args!("larch_server on {endpoint} shutting down"))?;
        }
        let server = self.settle_and_start(endpoint)?;
        write_started(output, &server)?;
        Ok(ExitCode::SUCCESS)
    }

    fn handle_next<W: Write, E: Write>(
        &self,
        state: LivenessState,
        endpoint: &ServiceEndpoint,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let from = endpoint.port();
        let free = match state {
            LivenessState::NotInUse => Some(from),
            _ => from
                .checked_add(1)
                .and_then(|following| self.first_free(endpoint, following)),
        };
        let port = free.ok_or(LifecycleError::NoAvailablePort { from })?;
        let server = self.start(&endpoint.with_port(port))?;
        write_started(output, &server)?;
        Ok(ExitCode::SUCCESS)
    }

    fn handle_report<W: Write, E: Write>(
        &self,
        state: LivenessState,
        endpoint: &ServiceEndpoint,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        if state != LivenessState::Connected {
            output.stdout_line(format_args!("no larch_server running on {endpoint}"))?;
            return Ok(ExitCode::FAILURE);
        }
        let report = self.report(endpoint)?;
        output.stdout_line(format_args!("{report}"))?;
        Ok(ExitCode::SUCCESS)
    }

    fn restart_from(
        &self,
        state: LivenessState,
        endpoint: &ServiceEndpoint,
    ) -> Result<DetachedServer, LifecycleError> {
        self.shutdown_if_connected(state, endpoint)?;
        self.settle_and_start(endpoint)
    }

    /// Returns whether a shutdown was requested.
    fn shutdown_if_connected(
        &self,
        state: LivenessState,
        endpoint: &ServiceEndpoint,
    ) -> Result<bool, LifecycleError> {
        match state {
            LivenessState::Connected => self.request_shutdown(endpoint).map(|()| true),
            LivenessState::NotInUse => Ok(false),
            LivenessState::NotLarchServer => Err(incompatible(endpoint)),
        }
    }

    fn settle_and_start(&self, endpoint: &ServiceEndpoint) -> Result<DetachedServer, LifecycleError> {
        thread::sleep(self.settings.settle_delay);
        match self.probe(endpoint) {
            LivenessState::NotInUse => self.start(endpoint),
            state => {
                debug!(
                    target: LIFECYCLE_TARGET,
                    %endpoint,
                    %state,
                    "port still occupied after settle delay"
                );
                Err(LifecycleError::PortBusy {
                    endpoint: endpoint.to_string(),
                    state,
                })
            }
        }
    }

    fn first_free(&self, endpoint: &ServiceEndpoint, from: u16) -> Option<u16> {
        (from..=u16::MAX)
            .find(|port| self.probe(&endpoint.with_port(*port)) == LivenessState::NotInUse)
    }

    fn request_shutdown(&self, endpoint: &ServiceEndpoint) -> Result<(), LifecycleError> {
        self.handle_for(endpoint)
            .shutdown()
            .map_err(|source| LifecycleError::RemoteCall {
                endpoint: endpoint.to_string(),
                method: methods::SHUTDOWN,
                source,
            })?;
        debug!(target: LIFECYCLE_TARGET, %endpoint, "requested remote shutdown");
        Ok(())
    }

    fn handle_for(&self, endpoint: &ServiceEndpoint) -> ServiceHandle {
        ServiceHandle::new(endpoint.clone(), self.settings.probe_timeout)
    }
}

fn incompatible(endpoint: &ServiceEndpoint) -> LifecycleError {
    LifecycleError::IncompatibleService {
        endpoint: endpoint.to_string(),
    }
}

fn write_started<W: Write, E: Write>(
    output: &mut LifecycleOutput<W, E>,
    server: &DetachedServer,
) -> Result<(), LifecycleError> {
    output.stdout_line(format_args!(
        "larch_server starting on {} (pid {})",
        server.endpoint, server.pid
    ))
}

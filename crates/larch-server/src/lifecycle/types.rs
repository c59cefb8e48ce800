//! Lifecycle command types and output abstractions.
//!
//! Defines the payloads and IO wrappers shared across lifecycle commands so the
//! controller can remain agnostic of concrete writers.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Write;

use larch_config::{Config, ServiceEndpoint};

use super::LifecycleError;
use crate::cli::ServerAction;

/// Supported lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Stop,
    Restart,
    Next,
    Status,
    Report,
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Next => "next",
            Self::Status => "status",
            Self::Report => "report",
        };
        formatter.write_str(name)
    }
}

impl From<ServerAction> for LifecycleCommand {
    fn from(action: ServerAction) -> Self {
        match action {
            ServerAction::Start => Self::Start,
            ServerAction::Stop => Self::Stop,
            ServerAction::Restart => Self::Restart,
            ServerAction::Next => Self::Next,
            ServerAction::Status => Self::Status,
            ServerAction::Report => Self::Report,
        }
    }
}

/// Invocation payload forwarded from the CLI runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleInvocation {
    pub command: LifecycleCommand,
    pub endpoint: ServiceEndpoint,
}

/// Shared configuration context available to lifecycle handlers.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext<'a> {
    pub config: &'a Config,
    /// Configuration flags forwarded verbatim to a spawned service.
    pub forwarded_flags: &'a [OsString],
    /// Overrides `LARCHD_BIN` and the default binary name.
    pub server_binary: Option<&'a OsStr>,
}

/// Classification of an endpoint produced by the compatibility probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// Nothing is listening.
    NotInUse,
    /// A compatible service answered the probe.
    Connected,
    /// Something is listening but did not answer like a compatible service.
    NotLarchServer,
}

impl fmt::Display for LivenessState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInUse => formatter.write_str("not in use"),
            Self::Connected => formatter.write_str("connected"),
            Self::NotLarchServer => formatter.write_str("in use by another process"),
        }
    }
}

/// Output handle abstracting over stdout/stderr writers.
pub struct LifecycleOutput<W: Write, E: Write> {
    pub stdout: W,
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    pub fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stdout.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stdout.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stdout.flush().map_err(LifecycleError::Io)
    }

    pub fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stderr.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stderr.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stderr.flush().map_err(LifecycleError::Io)
    }
}

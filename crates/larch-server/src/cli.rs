//! CLI argument definitions for `larch_server`.

use clap::{Parser, ValueEnum};

/// Command-line interface for the larch service controller.
#[derive(Parser, Debug)]
#[command(name = "larch_server", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Port of the service; defaults to the configured port (4966).
    #[arg(short = 'p', long)]
    pub(crate) port: Option<u16>,
    /// Host of the service; defaults to the configured host (127.0.0.1).
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Lifecycle action to perform.
    #[arg(value_enum, default_value_t = ServerAction::Status)]
    pub(crate) command: ServerAction,
}

/// Lifecycle actions accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServerAction {
    /// Starts a service on the port if nothing is listening there.
    Start,
    /// Asks a running service to shut down.
    Stop,
    /// Stops a running service, waits briefly, and starts a new one.
    Restart,
    /// Starts a service on the first free port at or above the port.
    Next,
    /// Reports whether a service is running; exits 0 when it is.
    Status,
    /// Prints client and keepalive details from a running service.
    Report,
}

//! Liveness controller for the larch session service.
//!
//! `larch_server` classifies a TCP endpoint as unused, owned by a compatible
//! `larchd`, or owned by some other process, and starts, stops, restarts or
//! reports on the service accordingly. The runtime is exercised both from the
//! binary entrypoint and from tests where configuration loading, the server
//! binary and IO streams can be substituted.

use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use larch_config::ServiceEndpoint;

mod cli;
mod config;
mod errors;
mod lifecycle;
mod transport;

#[cfg(test)]
mod tests;

use cli::Cli;
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
pub use lifecycle::{
    ClientReport, Controller, ControllerSettings, DetachedServer, LifecycleCommand,
    LifecycleContext, LifecycleError, LifecycleInvocation, LifecycleOutput, LivenessState,
    ProcessLauncher, RemainingTime, ServerLauncher, TimeUnit,
};
pub use transport::{HandleError, ServiceHandle};

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `larch_config::Config`;
/// `--host` and `--port` are deliberately left to clap.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--keepalive-secs",
    "--probe-timeout-ms",
    "--settle-delay-ms",
];

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
    server_binary: Option<&'a OsStr>,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(stdout: &'a mut W, stderr: &'a mut E, loader: &'a L) -> Self {
        Self {
            stdout,
            stderr,
            loader,
            server_binary: None,
        }
    }

    fn with_server_binary(mut self, server_binary: Option<&'a OsStr>) -> Self {
        self.server_binary = server_binary;
        self
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        self.run_with_handler(args, |invocation, context, output| {
            Controller::from_context(context).handle(invocation, output)
        })
    }

    fn run_with_handler<I, F>(&mut self, args: I, mut handler: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        F: FnMut(
            LifecycleInvocation,
            LifecycleContext<'_>,
            &mut LifecycleOutput<&mut W, &mut E>,
        ) -> Result<ExitCode, LifecycleError>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let forwarded = split.forwarded_flags();
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) if !error.use_stderr() => {
                // Help and version requests are not failures.
                let _ = write!(self.stdout, "{error}");
                return ExitCode::SUCCESS;
            }
            Err(error) => return self.fail(&AppError::CliUsage(error)),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                larch_config::telemetry::initialise(&config)?;
                let host = cli.host.clone().unwrap_or_else(|| config.host.clone());
                let endpoint = ServiceEndpoint::new(host, cli.port.unwrap_or(config.port));
                let invocation = LifecycleInvocation {
                    command: cli.command.into(),
                    endpoint,
                };
                let context = LifecycleContext {
                    config: &config,
                    forwarded_flags: &forwarded,
                    server_binary: self.server_binary,
                };
                let mut output = LifecycleOutput::new(&mut *self.stdout, &mut *self.stderr);
                handler(invocation, context, &mut output).map_err(AppError::from)
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => self.fail(&error),
        }
    }

    fn fail(&mut self, error: &AppError) -> ExitCode {
        let message = error.to_string();
        // Clap renders multi-line usage; keep the first line only.
        let line = message.lines().next().unwrap_or_default();
        let _ = writeln!(self.stderr, "{line}");
        ExitCode::FAILURE
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    CliRunner::new(stdout, stderr, &OrthoConfigLoader).run(args)
}

/// Runs the CLI with an explicit `larchd` binary instead of `LARCHD_BIN`.
#[must_use]
pub fn run_with_server_binary<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    server_binary: &OsStr,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    CliRunner::new(stdout, stderr, &OrthoConfigLoader)
        .with_server_binary(Some(server_binary))
        .run(args)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(rest) = args.get(split.command_start..) {
        cli_arguments.extend(rest.iter().cloned());
    }
    cli_arguments
}

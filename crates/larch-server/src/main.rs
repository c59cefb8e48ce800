//! CLI entrypoint for the larch service controller.
//!
//! The binary delegates to [`larch_server::run`], which loads configuration,
//! probes the configured endpoint, and performs the requested lifecycle
//! command.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    larch_server::run(std::env::args_os(), &mut stdout, &mut stderr)
}

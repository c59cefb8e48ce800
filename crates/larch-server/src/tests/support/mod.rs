//! Test support utilities for controller coverage.
//!
//! Supplies fake listeners, a fixed configuration loader and the behavioural
//! test world so step definitions and unit tests remain focused on their
//! assertions.

mod fake_service;

use std::cell::RefCell;
use std::ffi::OsString;
use std::net::TcpListener;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use larch_config::{Config, ServiceEndpoint};
use rstest::fixture;

use crate::{AppError, CliRunner, ConfigLoader, ControllerSettings};

pub(super) use fake_service::{
    Behaviour, FakeService, client_info, free_port, occupy_consecutive, silent_listener,
};

pub(super) const PROBE_TIMEOUT: Duration = Duration::from_millis(300);
pub(super) const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Settings short enough to keep foreign-listener probes fast.
pub(super) fn test_settings() -> ControllerSettings {
    ControllerSettings {
        probe_timeout: PROBE_TIMEOUT,
        settle_delay: SETTLE_DELAY,
    }
}

/// Loopback endpoint on `port`.
pub(super) fn loopback(port: u16) -> ServiceEndpoint {
    ServiceEndpoint::new("127.0.0.1", port)
}

/// Configuration pointing at `port` with test timings and quiet logs.
pub(super) fn test_config(port: u16) -> Config {
    Config {
        port,
        log_filter: String::from("off"),
        probe_timeout_ms: 300,
        settle_delay_ms: 50,
        ..Config::default()
    }
}

/// A config loader that returns a fixed configuration for tests.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Output captured from one CLI run.
pub(super) struct CliOutcome {
    pub exit_code: ExitCode,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the CLI runtime with `config` and an optional server binary.
pub(super) fn run_cli(
    config: Config,
    server_binary: Option<&OsString>,
    command: &str,
) -> Result<CliOutcome> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let loader = StaticConfigLoader::new(config);
    let exit_code = CliRunner::new(&mut stdout, &mut stderr, &loader)
        .with_server_binary(server_binary.map(OsString::as_os_str))
        .run(build_args(command));
    Ok(CliOutcome {
        exit_code,
        stdout: String::from_utf8(stdout).context("stdout utf8")?,
        stderr: String::from_utf8(stderr).context("stderr utf8")?,
    })
}

fn build_args(command: &str) -> Vec<OsString> {
    let mut args = vec![OsString::from("larch_server")];
    args.extend(
        command
            .split_whitespace()
            .map(|token| OsString::from(token.trim_matches('"'))),
    );
    args
}

/// Test world holding the listener under test and captured CLI output.
#[derive(Default)]
pub(super) struct TestWorld {
    pub port: u16,
    pub service: Option<FakeService>,
    pub foreign: Option<TcpListener>,
    pub server_binary: Option<OsString>,
    pub outcome: Option<CliOutcome>,
}

impl TestWorld {
    pub fn reserve_free_port(&mut self) -> Result<()> {
        self.port = free_port()?;
        Ok(())
    }

    pub fn start_service(&mut self, behaviour: Behaviour) -> Result<()> {
        let service = FakeService::spawn(behaviour)?;
        self.port = service.port();
        self.service = Some(service);
        Ok(())
    }

    pub fn start_compatible_service(&mut self, keepalive_secs: f64, idle_secs: f64) -> Result<()> {
        // The record carries a placeholder port; only the timings matter here.
        self.start_service(Behaviour::Compatible(client_info(
            0,
            keepalive_secs,
            idle_secs,
        )))
    }

    pub fn occupy_with_foreign_listener(&mut self) -> Result<()> {
        let (listener, port) = silent_listener()?;
        self.port = port;
        self.foreign = Some(listener);
        Ok(())
    }

    pub fn run(&mut self, command: &str) -> Result<()> {
        let outcome = run_cli(test_config(self.port), self.server_binary.as_ref(), command)?;
        self.outcome = Some(outcome);
        Ok(())
    }

    pub fn outcome(&self) -> Result<&CliOutcome> {
        self.outcome.as_ref().context("CLI has not run")
    }

    pub fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let outcome = self.outcome()?;
        ensure!(
            outcome.exit_code == ExitCode::from(expected),
            "expected exit code {expected}, got {:?} (stdout {:?}, stderr {:?})",
            outcome.exit_code,
            outcome.stdout,
            outcome.stderr
        );
        Ok(())
    }

    pub fn service_calls(&self) -> Result<Vec<String>> {
        self.service
            .as_ref()
            .context("no fake service running")?
            .calls()
    }
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

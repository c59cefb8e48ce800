//! Integration tests for the `larch_server` binary entry point.
//!
//! Verifies help output, usage errors and the status probe against a port
//! with nothing listening, including a port taken from a config file.

use std::fs;
use std::net::TcpListener;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

fn free_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe listener");
    listener.local_addr().expect("local addr").port()
}

#[test]
fn help_succeeds() {
    let mut command = cargo_bin_cmd!("larch_server");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("restart"));
}

#[test]
fn unknown_command_exits_with_failure() {
    let mut command = cargo_bin_cmd!("larch_server");
    command.arg("bogus");
    command.assert().failure().stderr(contains("bogus"));
}

#[test]
fn status_on_free_port_reports_not_running() {
    let port = free_port();
    let mut command = cargo_bin_cmd!("larch_server");
    command
        .args(["--log-filter", "off", "-p"])
        .arg(port.to_string())
        .arg("status");
    command
        .assert()
        .code(1)
        .stdout(contains("larch_server not running on 127.0.0.1"));
}

#[test]
fn config_file_supplies_the_port() {
    let port = free_port();
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("larch.toml");
    fs::write(&path, format!("port = {port}\nlog_filter = \"off\"\n")).expect("write config");

    let mut command = cargo_bin_cmd!("larch_server");
    command.arg("--config-path").arg(&path).arg("status");
    command
        .assert()
        .code(1)
        .stdout(contains(format!("not running on 127.0.0.1:{port}")));
}

#[test]
fn successful_stop_keeps_stderr_empty() {
    let port = free_port();
    let mut command = cargo_bin_cmd!("larch_server");
    command.args(["-p", &port.to_string(), "stop"]);
    command
        .assert()
        .success()
        .stdout(contains("not running"))
        .stderr(predicates::str::is_empty());
}

#[cfg(unix)]
#[test]
fn successful_start_keeps_stderr_empty() {
    let port = free_port();
    let mut command = cargo_bin_cmd!("larch_server");
    command
        .env("LARCHD_BIN", "true")
        .args(["-p", &port.to_string(), "start"]);
    command
        .assert()
        .success()
        .stdout(contains(format!("larch_server starting on 127.0.0.1:{port}")))
        .stderr(predicates::str::is_empty());
}

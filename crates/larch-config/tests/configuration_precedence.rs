//! Layering tests for `Config::load_from_iter`.
//!
//! Environment mutation is serialised through a process-wide mutex so the
//! tests can run in parallel with each other.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use larch_config::{Config, LogFormat};
use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    entries: Vec<(&'static str, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvOverride {
    fn lock() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self {
            entries: Vec::new(),
            _guard: guard,
        }
    }

    fn set(&mut self, key: &'static str, value: impl AsRef<OsStr>) {
        self.entries.push((key, std::env::var_os(key)));
        // Environment mutation is unsafe under edition 2024; the mutex above
        // keeps it single-threaded and `Drop` restores the previous value.
        unsafe { std::env::set_var(key, value) };
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        for (key, previous) in self.entries.drain(..).rev() {
            match previous {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

fn write_config(dir: &Path, body: &str) -> OsString {
    let path = dir.join("larch.toml");
    fs::write(&path, body).expect("write config file");
    path.into_os_string()
}

fn args(extra: &[OsString]) -> Vec<OsString> {
    let mut args = vec![OsString::from("larch_server")];
    args.extend(extra.iter().cloned());
    args
}

#[test]
fn config_file_overrides_defaults() {
    let _env = EnvOverride::lock();
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(
        dir.path(),
        "port = 5100\nlog_format = \"compact\"\nkeepalive_secs = 60\n",
    );

    let config = Config::load_from_iter(args(&[OsString::from("--config-path"), path]))
        .expect("load config");

    assert_eq!(config.port, 5100);
    assert_eq!(config.log_format, LogFormat::Compact);
    assert_eq!(config.keepalive_secs, 60);
    assert_eq!(config.host, "127.0.0.1");
}

#[test]
fn environment_overrides_config_file() {
    let mut env = EnvOverride::lock();
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(dir.path(), "port = 5100\n");
    env.set("LARCH_PORT", "5200");

    let config = Config::load_from_iter(args(&[OsString::from("--config-path"), path]))
        .expect("load config");

    assert_eq!(config.port, 5200);
}

#[test]
fn command_line_overrides_environment() {
    let mut env = EnvOverride::lock();
    env.set("LARCH_SETTLE_DELAY_MS", "900");

    let config = Config::load_from_iter(args(&[
        OsString::from("--settle-delay-ms"),
        OsString::from("25"),
    ]))
    .expect("load config");

    assert_eq!(config.settle_delay_ms, 25);
}

#[test]
fn malformed_config_file_fails_to_load() {
    let _env = EnvOverride::lock();
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(dir.path(), "port = \"not a number\"\n");

    let result = Config::load_from_iter(args(&[OsString::from("--config-path"), path]));

    assert!(result.is_err(), "expected load failure, got {result:?}");
}

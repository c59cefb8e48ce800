//! Shared configuration for `larch_server` and `larchd`.
//!
//! Both binaries load the same [`Config`] through `ortho_config`, which layers
//! built-in defaults, an optional TOML file (`--config-path` or
//! `LARCH_CONFIG_PATH`), `LARCH_*` environment variables, and command-line
//! flags. Agreeing on one structure keeps the controller and the service it
//! spawns pointed at the same endpoint and keepalive policy.

mod defaults;
mod endpoint;
mod logging;
pub mod telemetry;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HOST, DEFAULT_KEEPALIVE_SECS, DEFAULT_LOG_FILTER, DEFAULT_PORT,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_SETTLE_DELAY_MS, default_host,
    default_log_filter_string, default_log_format,
};
pub use endpoint::{EndpointParseError, ServiceEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Layered configuration shared by the controller and the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "LARCH")]
pub struct Config {
    /// Host name or address the service binds to and the controller probes.
    #[ortho_config(default = default_host())]
    pub host: String,
    /// TCP port of the service.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Tracing filter expression, for example `info` or `larchd=debug`.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Seconds of inactivity after which the service shuts itself down.
    #[ortho_config(default = DEFAULT_KEEPALIVE_SECS)]
    pub keepalive_secs: u64,
    /// Connect and read timeout applied to every remote call, in milliseconds.
    #[ortho_config(default = DEFAULT_PROBE_TIMEOUT_MS)]
    pub probe_timeout_ms: u64,
    /// Pause between stopping and starting during a restart, in milliseconds.
    #[ortho_config(default = DEFAULT_SETTLE_DELAY_MS)]
    pub settle_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl Config {
    /// Endpoint described by the configured host and port.
    #[must_use]
    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new(self.host.clone(), self.port)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Inactivity window before the service expires.
    #[must_use]
    pub const fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    /// Timeout applied to connects and reads against the service.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Delay inserted between stop and start during a restart.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

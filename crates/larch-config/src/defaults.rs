use crate::logging::LogFormat;

/// Well-known TCP port of the larch service.
pub const DEFAULT_PORT: u16 = 4966;

/// Loopback address probed and bound when no host is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Inactivity window before the service expires: twelve hours.
pub const DEFAULT_KEEPALIVE_SECS: u64 = 12 * 60 * 60;

/// Connect and read timeout for remote calls.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Pause between stop and start during a restart.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Owned default host, used where allocation is required (e.g. serde).
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

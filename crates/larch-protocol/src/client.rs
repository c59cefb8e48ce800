//! Session payloads exchanged through the client-info calls.

use serde::{Deserialize, Serialize};

/// Session details reported by a running service.
///
/// Timestamps are UNIX seconds and durations are seconds, both as floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Process id of the service itself.
    pub pid_server: u32,
    /// Port the service is bound to.
    pub port: u16,
    /// Process id of the attached client application, `0` when none.
    #[serde(default)]
    pub pid: u32,
    /// Name of the client application.
    #[serde(default = "unknown")]
    pub app: String,
    /// Host the client runs on.
    #[serde(default = "unknown")]
    pub machine: String,
    /// Account the client runs as.
    #[serde(default = "unknown")]
    pub user: String,
    /// Time of the last call that counted as activity.
    pub last_event: f64,
    /// Inactivity window after which the service exits.
    pub keepalive_time: f64,
}

/// Parameters of `set_client_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Process id of the client application.
    pub pid: u32,
    /// Name of the client application.
    #[serde(default = "unknown")]
    pub app: String,
    /// Host the client runs on.
    #[serde(default = "unknown")]
    pub machine: String,
    /// Account the client runs as.
    #[serde(default = "unknown")]
    pub user: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            pid: 0,
            app: unknown(),
            machine: unknown(),
            user: unknown(),
        }
    }
}

/// Parameters of `set_keepalive_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeepaliveParams {
    /// New inactivity window in seconds.
    pub seconds: f64,
}

fn unknown() -> String {
    String::from("unknown")
}

//! Human-readable summary of a running service's session.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use larch_config::ServiceEndpoint;
use larch_protocol::ClientInfo;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const ESCALATION_THRESHOLD: f64 = 300.0;
const ESCALATION_FACTOR: f64 = 60.0;

/// Unit attached to a [`RemainingTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    const fn escalate(self) -> Option<Self> {
        match self {
            Self::Seconds => Some(Self::Minutes),
            Self::Minutes => Some(Self::Hours),
            Self::Hours => None,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds => formatter.write_str("seconds"),
            Self::Minutes => formatter.write_str("minutes"),
            Self::Hours => formatter.write_str("hours"),
        }
    }
}

/// Time left before a service expires, in the coarsest readable unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemainingTime {
    pub value: f64,
    pub unit: TimeUnit,
}

impl RemainingTime {
    /// Converts seconds, moving to minutes and then hours while the value
    /// stays above 300.
    #[must_use]
    pub fn from_seconds(seconds: f64) -> Self {
        let mut value = seconds;
        let mut unit = TimeUnit::Seconds;
        while value > ESCALATION_THRESHOLD {
            let Some(next) = unit.escalate() else { break };
            value /= ESCALATION_FACTOR;
            unit = next;
        }
        Self { value, unit }
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {}", self.value.trunc(), self.unit)
    }
}

/// Session details of a running service, ready for printing.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientReport {
    pub endpoint: ServiceEndpoint,
    pub info: ClientInfo,
    pub remaining: RemainingTime,
    pub last_used: String,
}

impl ClientReport {
    /// Derives the report from `info` as observed at `now`.
    #[must_use]
    pub fn new(endpoint: ServiceEndpoint, info: ClientInfo, now: SystemTime) -> Self {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64());
        let idle = now_secs - info.last_event;
        // A service past its window reports zero until the monitor notices.
        let remaining = RemainingTime::from_seconds((info.keepalive_time - idle).max(0.0));
        let last_used = format_timestamp(info.last_event);
        Self {
            endpoint,
            info,
            remaining,
            last_used,
        }
    }
}

impl fmt::Display for ClientReport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "larch_server report for {}:", self.endpoint)?;
        writeln!(formatter, "  server pid   = {}", self.info.pid_server)?;
        writeln!(formatter, "  server port  = {}", self.info.port)?;
        writeln!(formatter, "  client app   = {}", self.info.app)?;
        writeln!(formatter, "  client pid   = {}", self.info.pid)?;
        writeln!(formatter, "  machine      = {}", self.info.machine)?;
        writeln!(formatter, "  user         = {}", self.info.user)?;
        writeln!(formatter, "  last used    = {}", self.last_used)?;
        write!(
            formatter,
            "server will expire in {} if not used",
            self.remaining
        )
    }
}

fn format_timestamp(seconds: f64) -> String {
    if !seconds.is_finite() {
        return String::from("unknown");
    }
    // Saturating float-to-int conversion; out-of-range values fail below.
    let whole = seconds.trunc() as i64;
    OffsetDateTime::from_unix_timestamp(whole)
        .ok()
        .and_then(|moment| moment.format(&Rfc3339).ok())
        .unwrap_or_else(|| String::from("unknown"))
}

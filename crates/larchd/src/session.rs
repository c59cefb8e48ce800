//! Session state shared by connection threads and the keepalive monitor.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use larch_protocol::{ClientIdentity, ClientInfo};

/// Current time as UNIX seconds.
pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}

#[derive(Debug)]
struct SessionState {
    identity: ClientIdentity,
    last_event: f64,
    keepalive_time: f64,
}

/// Identity of the attached client and the activity clock.
#[derive(Debug)]
pub(crate) struct Session {
    port: u16,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(port: u16, keepalive: Duration, now: f64) -> Self {
        Self {
            port,
            state: Mutex::new(SessionState {
                identity: ClientIdentity::default(),
                last_event: now,
                keepalive_time: keepalive.as_secs_f64(),
            }),
        }
    }

    /// Records activity at `now`.
    pub(crate) fn touch(&self, now: f64) {
        self.lock().last_event = now;
    }

    pub(crate) fn set_identity(&self, identity: ClientIdentity) {
        self.lock().identity = identity;
    }

    pub(crate) fn set_keepalive(&self, seconds: f64) {
        self.lock().keepalive_time = seconds;
    }

    pub(crate) fn keepalive_time(&self) -> f64 {
        self.lock().keepalive_time
    }

    pub(crate) fn client_info(&self) -> ClientInfo {
        let state = self.lock();
        ClientInfo {
            pid_server: std::process::id(),
            port: self.port,
            pid: state.identity.pid,
            app: state.identity.app.clone(),
            machine: state.identity.machine.clone(),
            user: state.identity.user.clone(),
            last_event: state.last_event,
            keepalive_time: state.keepalive_time,
        }
    }

    /// True once more than the keepalive window has passed since the last
    /// recorded activity.
    pub(crate) fn is_expired(&self, now: f64) -> bool {
        let state = self.lock();
        now - state.last_event > state.keepalive_time
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // Every update is a single assignment, so poisoning is ignored.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

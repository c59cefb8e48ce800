//! Background monitor that stops the service once the client goes quiet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::process::ShutdownReason;
use crate::process::shutdown::ShutdownSender;
use crate::session::{Session, unix_now};

const KEEPALIVE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::keepalive");

/// How often the activity clock is checked.
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Handle to the monitor thread.
pub(crate) struct KeepaliveMonitor {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl KeepaliveMonitor {
    /// Starts polling `session`; requests [`ShutdownReason::KeepaliveExpired`]
    /// once and then exits.
    pub(crate) fn spawn(session: Arc<Session>, sender: ShutdownSender, poll: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            debug!(
                target: KEEPALIVE_TARGET,
                poll_ms = poll.as_millis(),
                "keepalive monitor started"
            );
            while !stop_flag.load(Ordering::SeqCst) {
                thread::sleep(poll);
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }
                if session.is_expired(unix_now()) {
                    info!(
                        target: KEEPALIVE_TARGET,
                        keepalive_secs = session.keepalive_time(),
                        "no client activity within keepalive window"
                    );
                    sender.request(ShutdownReason::KeepaliveExpired);
                    break;
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops polling and waits for the thread. Returns `false` if it panicked.
    pub(crate) fn stop(mut self) -> bool {
        self.stop.store(true, Ordering::SeqCst);
        self.handle
            .take()
            .is_none_or(|handle| handle.join().is_ok())
    }
}

impl Drop for KeepaliveMonitor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

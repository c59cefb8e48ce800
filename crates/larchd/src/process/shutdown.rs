use std::fmt;
use std::io;
use std::sync::mpsc;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Why the service is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal arrived.
    Signal(i32),
    /// A client called `shutdown`.
    Remote,
    /// No client activity arrived within the keepalive window.
    KeepaliveExpired,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
            Self::Remote => formatter.write_str("remote shutdown request"),
            Self::KeepaliveExpired => formatter.write_str("keepalive expired"),
        }
    }
}

/// Cloneable handle used by every shutdown trigger.
#[derive(Debug, Clone)]
pub(crate) struct ShutdownSender {
    inner: mpsc::Sender<ShutdownReason>,
}

impl ShutdownSender {
    /// Requests shutdown. Requests after the service has stopped are dropped.
    pub(crate) fn request(&self, reason: ShutdownReason) {
        let _ = self.inner.send(reason);
    }
}

/// Creates the channel that collects shutdown requests.
pub(crate) fn shutdown_channel() -> (ShutdownSender, mpsc::Receiver<ShutdownReason>) {
    let (inner, receiver) = mpsc::channel();
    (ShutdownSender { inner }, receiver)
}

/// Abstraction over shutdown notification mechanisms.
pub(crate) trait ShutdownSignal: Send + Sync {
    /// Arranges for `sender` to be notified when shutdown should proceed.
    fn watch(&self, sender: ShutdownSender) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that waits for termination signals.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn watch(&self, sender: ShutdownSender) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(
                    target: PROCESS_TARGET,
                    signal,
                    "shutdown signal received"
                );
                sender.request(ShutdownReason::Signal(signal));
            }
        });
        Ok(())
    }
}

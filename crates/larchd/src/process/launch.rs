//! Supervises service startup, the shutdown wait and teardown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use larch_config::Config;
use ortho_config::OrthoConfig;
use tracing::info;

use crate::dispatch::RequestDispatcher;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::keepalive::{DEFAULT_POLL_INTERVAL, KeepaliveMonitor};
use crate::session::{Session, unix_now};
use crate::transport::{ListenerHandle, SocketListener};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{
    ShutdownReason, ShutdownSender, ShutdownSignal, SystemShutdownSignal, shutdown_channel,
};

/// A service that is bound and answering requests.
pub struct RunningService {
    local_addr: SocketAddr,
    sender: ShutdownSender,
    receiver: Receiver<ShutdownReason>,
    listener: ListenerHandle,
    monitor: KeepaliveMonitor,
    reporter: Arc<dyn HealthReporter>,
}

impl RunningService {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests shutdown as if the given trigger had fired.
    pub fn trigger(&self, reason: ShutdownReason) {
        self.sender.request(reason);
    }

    pub(crate) fn shutdown_sender(&self) -> ShutdownSender {
        self.sender.clone()
    }

    /// Blocks until a shutdown trigger fires, then tears the service down.
    pub fn wait(self) -> Result<ShutdownReason, LaunchError> {
        // The service keeps a sender, so the channel never disconnects.
        let reason = self
            .receiver
            .recv()
            .unwrap_or(ShutdownReason::Remote);
        self.finish(reason)
    }

    /// Like [`Self::wait`], but stops the service anyway once `timeout`
    /// elapses without a trigger, returning `None`.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Option<ShutdownReason>, LaunchError> {
        let reason = match self.receiver.recv_timeout(timeout) {
            Ok(reason) => Some(reason),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(ShutdownReason::Remote),
        };
        self.teardown(reason)?;
        Ok(reason)
    }

    fn finish(self, reason: ShutdownReason) -> Result<ShutdownReason, LaunchError> {
        self.teardown(Some(reason))?;
        Ok(reason)
    }

    fn teardown(self, reason: Option<ShutdownReason>) -> Result<(), LaunchError> {
        let Self {
            listener,
            monitor,
            reporter,
            ..
        } = self;
        if let Some(reason) = reason {
            reporter.shutdown_requested(reason);
        }
        listener.shutdown();
        listener.join()?;
        if !monitor.stop() {
            return Err(LaunchError::MonitorPanic);
        }
        reporter.service_stopped();
        info!(
            target: PROCESS_TARGET,
            reason = ?reason,
            "shutdown sequence completed"
        );
        Ok(())
    }
}

/// Binds the configured endpoint and starts answering requests.
pub fn start_service(
    config: &Config,
    reporter: Arc<dyn HealthReporter>,
) -> Result<RunningService, LaunchError> {
    start_service_with_poll(config, reporter, DEFAULT_POLL_INTERVAL)
}

pub(crate) fn start_service_with_poll(
    config: &Config,
    reporter: Arc<dyn HealthReporter>,
    poll: Duration,
) -> Result<RunningService, LaunchError> {
    let endpoint = config.endpoint();
    info!(
        target: PROCESS_TARGET,
        %endpoint,
        keepalive_secs = config.keepalive_secs,
        "starting service"
    );
    let listener = SocketListener::bind(&endpoint)?;
    let local_addr = listener.local_addr();
    let session = Arc::new(Session::new(
        local_addr.port(),
        config.keepalive(),
        unix_now(),
    ));
    let (sender, receiver) = shutdown_channel();
    let dispatcher = Arc::new(RequestDispatcher::new(
        Arc::clone(&session),
        sender.clone(),
        Arc::clone(&reporter),
    ));
    let listener = listener.start(dispatcher)?;
    let monitor = KeepaliveMonitor::spawn(Arc::clone(&session), sender.clone(), poll);
    reporter.service_ready(local_addr, session.keepalive_time());
    Ok(RunningService {
        local_addr,
        sender,
        receiver,
        listener,
        monitor,
        reporter,
    })
}

/// Runs the service using the production collaborators until it stops.
pub fn run_service() -> Result<ShutdownReason, LaunchError> {
    let config = Config::load().map_err(|source| LaunchError::Config { source })?;
    let _telemetry = larch_config::telemetry::initialise(&config)?;
    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    let outcome = run_service_with(&config, Arc::clone(&reporter), &SystemShutdownSignal);
    if let Err(error) = &outcome {
        reporter.service_failed(error);
    }
    outcome
}

/// Runs the service with injected collaborators.
pub(crate) fn run_service_with<S: ShutdownSignal>(
    config: &Config,
    reporter: Arc<dyn HealthReporter>,
    signal: &S,
) -> Result<ShutdownReason, LaunchError> {
    let service = start_service(config, reporter)?;
    signal.watch(service.shutdown_sender())?;
    service.wait()
}

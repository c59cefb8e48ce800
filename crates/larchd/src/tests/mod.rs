//! In-process service tests driven through the controller's client handle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use larch_config::{Config, ServiceEndpoint};
use larch_protocol::ClientIdentity;
use larch_server::{HandleError, ServiceHandle};
use mockall::mock;
use rstest::{fixture, rstest};

use crate::health::HealthReporter;
use crate::process::launch::{run_service_with, start_service_with_poll};
use crate::process::shutdown::{ShutdownError, ShutdownSender, ShutdownSignal};
use crate::{LaunchError, RunningService, ShutdownReason, StructuredHealthReporter};

const CALL_TIMEOUT: Duration = Duration::from_secs(2);
const POLL: Duration = Duration::from_millis(20);

mock! {
    pub Reporter {}
    impl HealthReporter for Reporter {
        fn service_ready(&self, address: SocketAddr, keepalive_secs: f64);
        fn client_registered(&self, identity: &ClientIdentity);
        fn keepalive_changed(&self, seconds: f64);
        fn shutdown_requested(&self, reason: ShutdownReason);
        fn service_stopped(&self);
        fn service_failed(&self, error: &LaunchError);
    }
}

/// Fires a shutdown request as soon as it is installed.
struct ImmediateSignal(ShutdownReason);

impl ShutdownSignal for ImmediateSignal {
    fn watch(&self, sender: ShutdownSender) -> Result<(), ShutdownError> {
        sender.request(self.0);
        Ok(())
    }
}

fn ephemeral_config(keepalive_secs: u64) -> Config {
    Config {
        host: String::from("127.0.0.1"),
        port: 0,
        log_filter: String::from("off"),
        keepalive_secs,
        ..Config::default()
    }
}

fn handle_for(service: &RunningService) -> ServiceHandle {
    let addr = service.local_addr();
    ServiceHandle::new(
        ServiceEndpoint::new(addr.ip().to_string(), addr.port()),
        CALL_TIMEOUT,
    )
}

#[fixture]
fn service() -> RunningService {
    start_service_with_poll(
        &ephemeral_config(3600),
        Arc::new(StructuredHealthReporter::new()),
        POLL,
    )
    .expect("start service")
}

#[rstest]
fn advertises_a_compatible_method_list(service: RunningService) {
    let methods = handle_for(&service).list_methods().expect("list methods");
    assert!(larch_protocol::is_compatible(methods.as_slice()));
    service.trigger(ShutdownReason::Remote);
    service.wait().expect("stop service");
}

#[rstest]
fn client_info_reports_bound_port_and_identity(service: RunningService) {
    let handle = handle_for(&service);
    handle
        .set_client_info(&ClientIdentity {
            pid: 4242,
            app: String::from("notebook"),
            machine: String::from("bench"),
            user: String::from("analyst"),
        })
        .expect("set client info");
    let info = handle.client_info().expect("client info");
    assert_eq!(info.port, service.local_addr().port());
    assert_eq!(info.pid, 4242);
    assert_eq!(info.user, "analyst");
    assert_eq!(info.pid_server, std::process::id());
    assert!((info.keepalive_time - 3600.0).abs() < f64::EPSILON);
    service.trigger(ShutdownReason::Remote);
    service.wait().expect("stop service");
}

#[rstest]
fn remote_shutdown_stops_the_service(service: RunningService) {
    let handle = handle_for(&service);
    handle.shutdown().expect("shutdown call acknowledged");
    let reason = service
        .wait_timeout(Duration::from_secs(5))
        .expect("teardown");
    assert_eq!(reason, Some(ShutdownReason::Remote));
    assert!(matches!(handle.list_methods(), Err(error) if error.is_unreachable()));
}

#[rstest]
fn short_keepalive_expires_the_service(service: RunningService) {
    handle_for(&service)
        .set_keepalive_time(0.2)
        .expect("set keepalive");
    let reason = service
        .wait_timeout(Duration::from_secs(5))
        .expect("teardown");
    assert_eq!(reason, Some(ShutdownReason::KeepaliveExpired));
}

#[rstest]
fn unknown_methods_surface_as_remote_errors(service: RunningService) {
    let error = handle_for(&service)
        .call("launch_rockets", serde_json::Value::Null)
        .expect_err("unknown method");
    assert!(matches!(error, HandleError::Response(_)));
    service.trigger(ShutdownReason::Remote);
    service.wait().expect("stop service");
}

#[test]
fn lifecycle_events_reach_the_reporter() {
    let mut reporter = MockReporter::new();
    reporter
        .expect_service_ready()
        .times(1)
        .returning(|_, _| ());
    reporter
        .expect_shutdown_requested()
        .withf(|reason| *reason == ShutdownReason::Signal(15))
        .times(1)
        .returning(|_| ());
    reporter.expect_service_stopped().times(1).returning(|| ());
    reporter.expect_service_failed().never();

    let reason = run_service_with(
        &ephemeral_config(3600),
        Arc::new(reporter),
        &ImmediateSignal(ShutdownReason::Signal(15)),
    )
    .expect("service run");
    assert_eq!(reason, ShutdownReason::Signal(15));
}

#[test]
fn occupied_port_fails_to_start() {
    let occupant = std::net::TcpListener::bind("127.0.0.1:0").expect("bind occupant");
    let config = Config {
        port: occupant.local_addr().expect("local addr").port(),
        ..ephemeral_config(3600)
    };
    let error = start_service_with_poll(&config, Arc::new(StructuredHealthReporter::new()), POLL)
        .err()
        .expect("bind should fail");
    assert!(matches!(error, LaunchError::Listener(_)));
}

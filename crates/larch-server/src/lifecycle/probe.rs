//! Endpoint classification through the compatibility probe.

use std::time::Duration;

use larch_config::ServiceEndpoint;
use larch_protocol::is_compatible;
use tracing::debug;

use super::{LIFECYCLE_TARGET, LivenessState};
use crate::transport::{HandleError, ServiceHandle};

/// Classifies `endpoint` by calling `system.listMethods` once.
///
/// Never fails: unreachable endpoints are [`LivenessState::NotInUse`] and any
/// other failure, including a reply that lacks a required method, is
/// [`LivenessState::NotLarchServer`].
pub(super) fn probe_endpoint(endpoint: &ServiceEndpoint, timeout: Duration) -> LivenessState {
    let handle = ServiceHandle::new(endpoint.clone(), timeout);
    let state = classify(handle.list_methods());
    debug!(target: LIFECYCLE_TARGET, %endpoint, %state, "probed endpoint");
    state
}

fn classify(outcome: Result<Vec<String>, HandleError>) -> LivenessState {
    match outcome {
        Ok(advertised) if is_compatible(&advertised) => LivenessState::Connected,
        Ok(advertised) => {
            debug!(
                target: LIFECYCLE_TARGET,
                advertised = ?advertised,
                "listener is missing required methods"
            );
            LivenessState::NotLarchServer
        }
        Err(error) if error.is_unreachable() => LivenessState::NotInUse,
        Err(error) => {
            debug!(target: LIFECYCLE_TARGET, %error, "probe failed against a listener");
            LivenessState::NotLarchServer
        }
    }
}

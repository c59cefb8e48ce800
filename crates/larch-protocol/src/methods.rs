//! Remote method names and the compatibility signature.

/// Introspection call used as the compatibility probe.
pub const LIST_METHODS: &str = "system.listMethods";
/// Returns the [`ClientInfo`](crate::ClientInfo) record.
pub const GET_CLIENT_INFO: &str = "get_client_info";
/// Records the identity of the attached client application.
pub const SET_CLIENT_INFO: &str = "set_client_info";
/// Replaces the inactivity window.
pub const SET_KEEPALIVE_TIME: &str = "set_keepalive_time";
/// Asks the service to exit after replying.
pub const SHUTDOWN: &str = "shutdown";

/// Every method a compatible service advertises.
pub const ALL: &[&str] = &[
    LIST_METHODS,
    GET_CLIENT_INFO,
    SET_CLIENT_INFO,
    SET_KEEPALIVE_TIME,
    SHUTDOWN,
];

/// Methods whose presence in a `system.listMethods` reply marks a listener as
/// a compatible service.
pub const REQUIRED: &[&str] = &[GET_CLIENT_INFO, SET_CLIENT_INFO, SET_KEEPALIVE_TIME, SHUTDOWN];

/// Returns true when an advertised method list satisfies [`REQUIRED`].
#[must_use]
pub fn is_compatible<S: AsRef<str>>(advertised: &[S]) -> bool {
    REQUIRED
        .iter()
        .all(|required| advertised.iter().any(|method| method.as_ref() == *required))
}

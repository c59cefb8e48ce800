//! Connection handler that answers one JSON-RPC call per connection.
//!
//! Each accepted connection carries a single request line. The dispatcher
//! decodes it, routes it against the [`Session`], writes one response line and
//! closes the connection. A successful `shutdown` call is acknowledged before
//! the shutdown request is raised so the caller always sees its reply.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use larch_protocol::{
    ClientIdentity, ErrorCode, JSONRPC_VERSION, KeepaliveParams, Request, Response, methods,
    read_frame, write_frame,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::health::HealthReporter;
use crate::process::ShutdownReason;
use crate::process::shutdown::ShutdownSender;
use crate::session::{Session, unix_now};
use crate::transport::ConnectionHandler;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Budget for a client to deliver its request line.
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Reply to a single frame and whether shutdown follows it.
#[derive(Debug)]
struct Reply {
    response: Response,
    shutdown: bool,
}

impl Reply {
    fn respond(response: Response) -> Self {
        Self {
            response,
            shutdown: false,
        }
    }
}

/// Routes requests against the shared session.
pub(crate) struct RequestDispatcher {
    session: Arc<Session>,
    shutdown: ShutdownSender,
    reporter: Arc<dyn HealthReporter>,
}

impl RequestDispatcher {
    pub(crate) fn new(
        session: Arc<Session>,
        shutdown: ShutdownSender,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            session,
            shutdown,
            reporter,
        }
    }

    fn respond(&self, frame: &[u8]) -> Reply {
        let value: Value = match serde_json::from_slice(frame) {
            Ok(value) => value,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed request");
                return Reply::respond(Response::failure(
                    Value::Null,
                    ErrorCode::ParseError,
                    format!("parse error: {error}"),
                ));
            }
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "invalid request");
                return Reply::respond(Response::failure(
                    id,
                    ErrorCode::InvalidRequest,
                    format!("invalid request: {error}"),
                ));
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Reply::respond(Response::failure(
                id,
                ErrorCode::InvalidRequest,
                format!("unsupported jsonrpc version '{}'", request.jsonrpc),
            ));
        }
        debug!(target: DISPATCH_TARGET, method = %request.method, "dispatching request");
        self.route(request)
    }

    fn route(&self, request: Request) -> Reply {
        let id = request.id.clone();
        match request.method.as_str() {
            methods::LIST_METHODS => Reply::respond(Response::success(
                id,
                Value::from(methods::ALL.to_vec()),
            )),
            methods::GET_CLIENT_INFO => match serde_json::to_value(self.session.client_info()) {
                Ok(info) => Reply::respond(Response::success(id, info)),
                Err(error) => Reply::respond(Response::failure(
                    id,
                    ErrorCode::InternalError,
                    error.to_string(),
                )),
            },
            methods::SET_CLIENT_INFO => match request.params_as::<ClientIdentity>() {
                Ok(identity) => {
                    self.reporter.client_registered(&identity);
                    self.session.set_identity(identity);
                    self.session.touch(unix_now());
                    Reply::respond(Response::success(id, Value::Bool(true)))
                }
                Err(error) => invalid_params(id, &error),
            },
            methods::SET_KEEPALIVE_TIME => match request.params_as::<KeepaliveParams>() {
                Ok(KeepaliveParams { seconds }) if seconds.is_finite() && seconds >= 0.0 => {
                    self.session.set_keepalive(seconds);
                    self.session.touch(unix_now());
                    self.reporter.keepalive_changed(seconds);
                    Reply::respond(Response::success(id, Value::Bool(true)))
                }
                Ok(KeepaliveParams { seconds }) => Reply::respond(Response::failure(
                    id,
                    ErrorCode::InvalidParams,
                    format!("keepalive must be a non-negative number of seconds, got {seconds}"),
                )),
                Err(error) => invalid_params(id, &error),
            },
            methods::SHUTDOWN => {
                self.session.touch(unix_now());
                Reply {
                    response: Response::success(id, Value::Bool(true)),
                    shutdown: true,
                }
            }
            other => Reply::respond(Response::failure(
                id,
                ErrorCode::MethodNotFound,
                format!("method '{other}' not found"),
            )),
        }
    }
}

fn invalid_params(id: Value, error: &serde_json::Error) -> Reply {
    Reply::respond(Response::failure(
        id,
        ErrorCode::InvalidParams,
        format!("invalid params: {error}"),
    ))
}

impl ConnectionHandler for RequestDispatcher {
    fn handle(&self, mut stream: TcpStream) {
        if let Err(error) = stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT)) {
            warn!(target: DISPATCH_TARGET, %error, "failed to set read timeout");
        }
        let frame = match read_frame(&mut stream) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                return;
            }
        };
        let reply = self.respond(&frame);
        if let Err(error) = write_frame(&mut stream, &reply.response) {
            warn!(target: DISPATCH_TARGET, %error, "failed to write response");
        }
        if reply.shutdown {
            self.shutdown.request(ShutdownReason::Remote);
        }
    }
}

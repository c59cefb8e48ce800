//! JSON-RPC client used by the controller to talk to a running service.
//!
//! Every call opens a fresh TCP connection, writes one request line and reads
//! one response line. Connects, reads and writes all share the handle's
//! timeout, so a silent listener cannot stall the controller.

use std::cell::Cell;
use std::io;
use std::net::TcpStream;
use std::time::Duration;

use larch_config::ServiceEndpoint;
use larch_protocol::{
    ClientIdentity, ClientInfo, KeepaliveParams, Request, Response, ResponseError, methods,
    read_frame, write_frame,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

const MINIMUM_TIMEOUT: Duration = Duration::from_millis(1);

/// Errors raised by a single remote call.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),
    #[error("failed to read response: {0}")]
    Receive(#[source] io::Error),
    #[error("connection closed before a response arrived")]
    Closed,
    #[error("failed to parse response: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("response id {received} does not match request id {expected}")]
    MismatchedId { expected: u64, received: Value },
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error("unexpected result shape for '{method}': {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl HandleError {
    /// Returns true when the failure means nothing is listening.
    ///
    /// Hosts that fail to resolve count as unreachable; refused and
    /// unavailable addresses do too. Any other connect error, such as a
    /// timeout or a permission failure, means something may be there.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Resolve { .. } => true,
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotFound
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}

/// Client bound to one endpoint for the duration of a controller invocation.
#[derive(Debug)]
pub struct ServiceHandle {
    endpoint: ServiceEndpoint,
    timeout: Duration,
    next_id: Cell<u64>,
}

impl ServiceHandle {
    /// Creates a handle; timeouts below one millisecond are raised to it.
    #[must_use]
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout: timeout.max(MINIMUM_TIMEOUT),
            next_id: Cell::new(1),
        }
    }

    /// Names of the methods the remote advertises.
    pub fn list_methods(&self) -> Result<Vec<String>, HandleError> {
        self.call_typed(methods::LIST_METHODS, Value::Null)
    }

    /// Session record of the remote service.
    pub fn client_info(&self) -> Result<ClientInfo, HandleError> {
        self.call_typed(methods::GET_CLIENT_INFO, Value::Null)
    }

    /// Records the identity of the calling application.
    pub fn set_client_info(&self, identity: &ClientIdentity) -> Result<(), HandleError> {
        let params = serde_json::to_value(identity).map_err(|source| HandleError::Decode {
            method: methods::SET_CLIENT_INFO,
            source,
        })?;
        self.call(methods::SET_CLIENT_INFO, params).map(|_| ())
    }

    /// Replaces the remote inactivity window.
    pub fn set_keepalive_time(&self, seconds: f64) -> Result<(), HandleError> {
        let params = serde_json::to_value(KeepaliveParams { seconds }).map_err(|source| {
            HandleError::Decode {
                method: methods::SET_KEEPALIVE_TIME,
                source,
            }
        })?;
        self.call(methods::SET_KEEPALIVE_TIME, params).map(|_| ())
    }

    /// Asks the remote to exit. Returns once the reply arrives.
    pub fn shutdown(&self) -> Result<(), HandleError> {
        self.call(methods::SHUTDOWN, Value::Null).map(|_| ())
    }

    /// Issues one remote call and returns its raw result.
    pub fn call(&self, method: &str, params: Value) -> Result<Value, HandleError> {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        let request = Request::new(id, method).with_params(params);

        let mut stream = self.connect()?;
        write_frame(&mut stream, &request).map_err(HandleError::Send)?;
        let frame = read_frame(&mut stream)
            .map_err(HandleError::Receive)?
            .ok_or(HandleError::Closed)?;
        let response: Response = serde_json::from_slice(&frame).map_err(HandleError::Parse)?;
        if response.id != Value::from(id) {
            return Err(HandleError::MismatchedId {
                expected: id,
                received: response.id,
            });
        }
        Ok(response.into_result()?)
    }

    fn call_typed<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, HandleError> {
        let result = self.call(method, params)?;
        serde_json::from_value(result).map_err(|source| HandleError::Decode { method, source })
    }

    fn connect(&self) -> Result<TcpStream, HandleError> {
        let address = self.endpoint.resolve().map_err(|source| HandleError::Resolve {
            endpoint: self.endpoint.to_string(),
            source,
        })?;
        let stream = TcpStream::connect_timeout(&address, self.timeout).map_err(|source| {
            HandleError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            }
        })?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|source| HandleError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        Ok(stream)
    }
}

//! JSON-RPC 2.0 envelopes.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Protocol version carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// A single remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version; always [`JSONRPC_VERSION`] when sent by this crate.
    pub jsonrpc: String,
    /// Correlates the reply with the call.
    #[serde(default)]
    pub id: Value,
    /// Remote method name.
    pub method: String,
    /// Method parameters, omitted when null.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    /// Builds a parameterless request.
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: Value::from(id),
            method: method.into(),
            params: Value::Null,
        }
    }

    /// Attaches parameters to the request.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Decodes the parameters into a typed payload.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.params)
    }
}

/// Standard JSON-RPC error codes used by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The request line was not JSON.
    ParseError,
    /// The JSON was not a valid request envelope.
    InvalidRequest,
    /// No such method.
    MethodNotFound,
    /// The parameters did not match the method.
    InvalidParams,
    /// The service failed while answering.
    InternalError,
}

impl ErrorCode {
    /// Numeric code sent on the wire.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }
}

/// Error object returned in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for RpcError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} (code {})", self.message, self.code)
    }
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version.
    pub jsonrpc: String,
    /// Identifier copied from the request, or null when it was unreadable.
    #[serde(default)]
    pub id: Value,
    /// Result of a successful call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error of a failed call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Builds a successful reply.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error reply.
    #[must_use]
    pub fn failure(id: Value, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(RpcError {
                code: code.code(),
                message: message.into(),
            }),
        }
    }

    /// Splits the envelope into its result or error.
    ///
    /// Envelopes with the wrong version, or with both or neither of `result`
    /// and `error`, are reported as malformed.
    pub fn into_result(self) -> Result<Value, ResponseError> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(ResponseError::Malformed("unsupported jsonrpc version"));
        }
        match (self.result, self.error) {
            (Some(result), None) => Ok(result),
            (None, Some(error)) => Err(ResponseError::Remote(error)),
            (Some(_), Some(_)) => Err(ResponseError::Malformed(
                "response carries both result and error",
            )),
            (None, None) => Err(ResponseError::Malformed(
                "response carries neither result nor error",
            )),
        }
    }
}

/// Reasons a [`Response`] does not yield a result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    /// The service answered with an error object.
    #[error("remote error: {0}")]
    Remote(RpcError),
    /// The envelope broke the protocol.
    #[error("malformed response: {0}")]
    Malformed(&'static str),
}

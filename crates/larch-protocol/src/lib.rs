//! Wire types exchanged between `larch_server` and `larchd`.
//!
//! The service speaks newline-delimited JSON-RPC 2.0 over TCP. A client opens
//! a connection, writes one [`Request`] terminated by `\n`, and reads one
//! [`Response`] line back. The [`methods`] module names the calls a
//! compatible service must expose; [`is_compatible`] is the signature check
//! behind the controller's liveness probe.

mod client;
mod framing;
mod message;
pub mod methods;

pub use client::{ClientIdentity, ClientInfo, KeepaliveParams};
pub use framing::{MAX_FRAME_BYTES, read_frame, write_frame};
pub use message::{ErrorCode, JSONRPC_VERSION, Request, Response, ResponseError, RpcError};
pub use methods::is_compatible;

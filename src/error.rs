use std::sync::Arc;
use std::time::Duration;

use streamrpc_codec::{CodecError, CodecType};
use thiserror::Error;

/// Errors surfaced by the RPC client.
///
/// Cloneable because a single connection failure is delivered to every pending call.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RpcError {
    /// No codec is registered for the requested codec type.
    #[error("invalid codec type {0}")]
    Protocol(CodecType),

    /// The underlying connection failed while dialing or negotiating.
    #[error("transport error: {0}")]
    Transport(#[source] Arc<std::io::Error>),

    /// The HTTP CONNECT handshake was rejected or unreadable.
    #[error("unexpected HTTP response: {0}")]
    Tunnel(String),

    /// Connecting or negotiating did not finish within the connect timeout.
    #[error("connect timeout: expect within {0:?}")]
    DialTimeout(Duration),

    /// The address string is not of the form `protocol@addr`.
    #[error("wrong address format '{0}', expect protocol@addr")]
    Format(String),

    /// The address or network names a protocol the client cannot dial.
    #[error("unsupported protocol {0}, expect http or tcp")]
    UnsupportedProtocol(String),

    /// The client is closing or the connection has shut down.
    #[error("connection has shut down")]
    Shutdown,

    /// The caller stopped waiting for the call.
    #[error("call cancelled: {0}")]
    Cancelled(String),

    /// The server reported an error for this call.
    #[error("{0}")]
    Remote(String),

    /// The response body could not be read.
    #[error("reading body: {0}")]
    ReadBody(#[source] Arc<CodecError>),

    /// The codec failed to encode or decode a message.
    #[error("codec error: {0}")]
    Codec(#[source] Arc<CodecError>),
}

impl From<CodecError> for RpcError {
    fn from(err: CodecError) -> Self {
        RpcError::Codec(Arc::new(err))
    }
}

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        RpcError::Transport(Arc::new(err))
    }
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;

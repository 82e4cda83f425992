use thiserror::Error;

/// Errors that can occur while reading or writing codec frames.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The underlying byte stream failed.
    #[error("codec I/O error")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream at a frame boundary.
    #[error("connection closed by peer")]
    Closed,

    /// Failed to serialize a header or body.
    #[error("encode error: {0}")]
    Encode(String),

    /// Failed to deserialize a header or body.
    #[error("decode error: {0}")]
    Decode(String),
}

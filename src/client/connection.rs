//! Connection bootstrap: turns a raw byte stream into a [`Client`].
//!
//! Every connection starts with a fixed preamble of three big-endian `u64` values:
//! the magic number, the codec type and the connect timeout in nanoseconds. Everything
//! after the preamble belongs to the selected codec.
//!
//! The HTTP variant first tunnels through `CONNECT <rpc path> HTTP/1.0`.

use bytes::{BufMut, BytesMut};
use streamrpc_codec::{Connection, codec_factory};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::client::config::Options;
use crate::client::rpc_client::Client;
use crate::error::{Result, RpcError};

/// Path the HTTP tunnel is requested on.
pub const DEFAULT_RPC_PATH: &str = "/_streamrpc_";

/// Status line a server answers a successful CONNECT with.
pub const CONNECTED: &str = "200 Connected to streamrpc";

/// Size of the connection preamble in bytes.
pub const PREAMBLE_LEN: usize = 24;

/// Upper bound on the HTTP response head read during the tunnel handshake.
const MAX_RESPONSE_HEAD: usize = 8 * 1024;

/// Negotiate the protocol over `conn` and start a client on it.
///
/// Fails with [`RpcError::Protocol`] before anything is written when no codec is
/// registered for the requested codec type. If the preamble cannot be written the
/// connection is shut down before the error is returned.
pub async fn new_client<C: Connection>(mut conn: C, opts: Options) -> Result<Client> {
    let Some(factory) = codec_factory(opts.codec_type) else {
        warn!(codec_type = %opts.codec_type, "Invalid codec type");
        return Err(RpcError::Protocol(opts.codec_type));
    };

    if let Err(e) = write_preamble(&mut conn, &opts).await {
        warn!(error = %e, "Failed to write connection preamble");
        let _ = conn.shutdown().await;
        return Err(e.into());
    }

    debug!(codec_type = %opts.codec_type, "Connection negotiated");
    Ok(Client::with_codec(factory(Box::new(conn)), opts))
}

/// Tunnel through an HTTP CONNECT request, then negotiate as [`new_client`] does.
///
/// A failed request write, an unreadable response or any status other than
/// [`CONNECTED`] fails with [`RpcError::Tunnel`].
pub async fn new_http_client<C: Connection>(mut conn: C, opts: Options) -> Result<Client> {
    let request = format!("CONNECT {DEFAULT_RPC_PATH} HTTP/1.0\n\n");
    if let Err(e) = conn.write_all(request.as_bytes()).await {
        warn!(error = %e, "Failed to write CONNECT request");
        let _ = conn.shutdown().await;
        return Err(RpcError::Tunnel(format!("writing request: {e}")));
    }

    let status = match read_response_status(&mut conn).await {
        Ok(status) => status,
        Err(e) => {
            let _ = conn.shutdown().await;
            return Err(e);
        }
    };
    if status != CONNECTED {
        warn!(%status, "HTTP tunnel rejected");
        let _ = conn.shutdown().await;
        return Err(RpcError::Tunnel(status));
    }

    new_client(conn, opts).await
}

pub(crate) fn preamble(opts: &Options) -> BytesMut {
    let mut buf = BytesMut::with_capacity(PREAMBLE_LEN);
    buf.put_u64(opts.magic_number);
    buf.put_u64(opts.codec_type.0);
    buf.put_u64(opts.connect_timeout_units());
    buf
}

async fn write_preamble<C: Connection>(conn: &mut C, opts: &Options) -> std::io::Result<()> {
    conn.write_all(&preamble(opts)).await?;
    conn.flush().await
}

/// Read one HTTP response head and return its status, e.g. `200 Connected to streamrpc`.
///
/// Reads one byte at a time so nothing past the head is consumed from the stream.
async fn read_response_status<C: Connection>(conn: &mut C) -> Result<String> {
    let mut head = Vec::with_capacity(128);
    loop {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(RpcError::Tunnel("response head too large".to_string()));
        }
        let byte = conn
            .read_u8()
            .await
            .map_err(|e| RpcError::Tunnel(format!("reading response: {e}")))?;
        head.push(byte);
        if head.ends_with(b"\n\n") || head.ends_with(b"\r\n\r\n") {
            break;
        }
    }

    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut response = httparse::Response::new(&mut headers);
    match response.parse(&head) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return Err(RpcError::Tunnel("incomplete response head".to_string()));
        }
        Err(e) => return Err(RpcError::Tunnel(format!("malformed response: {e}"))),
    }

    let code = response.code.unwrap_or_default();
    let reason = response.reason.unwrap_or_default();
    Ok(format!("{code} {reason}"))
}

use std::future::Future;
use std::sync::Arc;
use streamrpc_codec::Connection;
use tokio::net::TcpStream;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::address::{Protocol, RpcAddress};
use crate::client::config::Options;
use crate::client::connection::{new_client, new_http_client};
use crate::client::rpc_client::Client;
use crate::error::{Result, RpcError};

/// Connect to an RPC server speaking the raw protocol.
///
/// `network` is `tcp` (or `unix` on unix platforms).
pub async fn dial(network: &str, address: &str, opts: Option<Options>) -> Result<Client> {
    dial_timeout(network, address, opts, new_client::<Box<dyn Connection>>).await
}

/// Connect to an RPC server through an HTTP CONNECT tunnel.
pub async fn dial_http(network: &str, address: &str, opts: Option<Options>) -> Result<Client> {
    dial_timeout(network, address, opts, new_http_client::<Box<dyn Connection>>).await
}

/// Connect using an address string of the form `protocol@addr`.
///
/// # Example
///
/// ```ignore
/// let client = streamrpc::xdial("http@127.0.0.1:7001", None).await?;
/// let sum: i32 = client.call("Arith.Sum", &(1, 2)).await?;
/// ```
pub async fn xdial(rpc_addr: &str, opts: Option<Options>) -> Result<Client> {
    let address = RpcAddress::parse(rpc_addr)?;
    match address.protocol {
        Protocol::Http => dial_http("tcp", &address.addr, opts).await,
        Protocol::Tcp => dial("tcp", &address.addr, opts).await,
    }
}

/// Connect, then build a client with `new_client`, both bounded by the connect timeout.
///
/// A zero timeout waits as long as it takes. When the timeout fires while `new_client`
/// is still running, its task is aborted, which drops and closes the connection it owns.
pub(crate) async fn dial_timeout<F, Fut>(
    network: &str,
    address: &str,
    opts: Option<Options>,
    new_client: F,
) -> Result<Client>
where
    F: FnOnce(Box<dyn Connection>, Options) -> Fut,
    Fut: Future<Output = Result<Client>> + Send + 'static,
{
    let opts = Options::resolve(opts);
    let timeout = opts.connect_timeout;

    let conn = if timeout.is_zero() {
        connect(network, address).await?
    } else {
        tokio::time::timeout(timeout, connect(network, address))
            .await
            .map_err(|_| RpcError::DialTimeout(timeout))??
    };
    debug!(%network, %address, "Connected");

    let mut task = tokio::spawn(new_client(conn, opts));
    if timeout.is_zero() {
        return joined(task.await);
    }

    tokio::select! {
        result = &mut task => joined(result),
        _ = tokio::time::sleep(timeout) => {
            task.abort();
            warn!(%network, %address, ?timeout, "Connect timeout");
            Err(RpcError::DialTimeout(timeout))
        }
    }
}

async fn connect(network: &str, address: &str) -> Result<Box<dyn Connection>> {
    match network {
        "tcp" | "tcp4" | "tcp6" => {
            let stream = TcpStream::connect(address).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
        #[cfg(unix)]
        "unix" => Ok(Box::new(tokio::net::UnixStream::connect(address).await?)),
        other => Err(RpcError::UnsupportedProtocol(other.to_owned())),
    }
}

fn joined(result: std::result::Result<Result<Client>, JoinError>) -> Result<Client> {
    match result {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(RpcError::Transport(Arc::new(std::io::Error::other(e)))),
    }
}

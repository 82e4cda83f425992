use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use streamrpc_codec::{Codec, CodecError, CodecRead, CodecWrite, Format, Header};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::call::{DEFAULT_DONE_CAPACITY, DoneSender, Pending, PendingCall, done_channel};
use crate::client::config::Options;
use crate::client::registry::PendingCalls;
use crate::error::{Result, RpcError};

/// An RPC client bound to a single connection.
///
/// Calls may be issued concurrently from any number of tasks. Requests are written one
/// frame at a time, while responses are matched back to their callers by sequence number
/// in whatever order the server sends them.
///
/// Dropping the client stops its receive loop and fails every pending call.
pub struct Client {
    inner: Arc<Inner>,
    receive_task: JoinHandle<()>,
}

struct Inner {
    /// Lock order: `state` before `writer`. Code that needs both goes through `lock_all`.
    state: Mutex<PendingCalls>,
    writer: Mutex<Box<dyn CodecWrite>>,
    format: Format,
    options: Options,
    /// Cancelled on close, drop or termination. Interrupts in-flight reads and writes
    /// so the writer lock is never held past that point.
    closed: CancellationToken,
}

impl Client {
    /// Wrap an already negotiated codec and start the receive loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_codec(codec: Codec, options: Options) -> Self {
        let (reader, writer, format) = codec.split();
        let inner = Arc::new(Inner {
            state: Mutex::new(PendingCalls::new()),
            writer: Mutex::new(writer),
            format,
            options,
            closed: CancellationToken::new(),
        });
        let receive_task = tokio::spawn(receive(Arc::clone(&inner), reader));
        Self {
            inner,
            receive_task,
        }
    }

    /// The options this client was negotiated with.
    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Returns true until the client is closed or its connection shuts down.
    pub async fn is_available(&self) -> bool {
        self.inner.state.lock().await.is_available()
    }

    /// Close the connection.
    ///
    /// Pending calls fail with [`RpcError::Shutdown`]. Closing twice returns
    /// [`RpcError::Shutdown`].
    ///
    /// A request write stalled on a peer that stopped reading is abandoned and its call
    /// fails with [`RpcError::Shutdown`].
    pub async fn close(&self) -> Result<()> {
        if !self.inner.state.lock().await.begin_close() {
            return Err(RpcError::Shutdown);
        }
        self.inner.closed.cancel();
        let result = self.inner.writer.lock().await.close().await;
        debug!("Client closed");
        result.map_err(RpcError::from)
    }

    /// Start a call without waiting for it.
    ///
    /// The resolved [`Call`](crate::Call) is delivered through `done`, or through a fresh
    /// channel of capacity 10 reachable via [`Pending::done`] when `done` is `None`.
    /// A call issued after close or shutdown resolves immediately with
    /// [`RpcError::Shutdown`] and is never sent.
    pub async fn go<A>(&self, service_method: &str, args: &A, done: Option<DoneSender>) -> Pending
    where
        A: Serialize + ?Sized,
    {
        let (done, receiver) = match done {
            Some(done) => (done, None),
            None => {
                let (done, receiver) = done_channel(DEFAULT_DONE_CAPACITY);
                (done, Some(receiver))
            }
        };
        let call = PendingCall::new(service_method, self.inner.format, done);
        let seq = self.inner.send(call, args).await;
        Pending::new(seq, receiver)
    }

    /// Invoke `service_method` and wait for the reply.
    pub async fn call<A, R>(&self, service_method: &str, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_until(service_method, args, std::future::pending())
            .await
    }

    /// Invoke `service_method`, giving up after `timeout`.
    pub async fn call_with_timeout<A, R>(
        &self,
        service_method: &str,
        args: &A,
        timeout: Duration,
    ) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_until(service_method, args, async move {
            tokio::time::sleep(timeout).await;
            "deadline exceeded".to_string()
        })
        .await
    }

    /// Invoke `service_method`, giving up when `token` is cancelled.
    pub async fn call_with_cancel<A, R>(
        &self,
        service_method: &str,
        args: &A,
        token: &CancellationToken,
    ) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_until(service_method, args, async move {
            token.cancelled().await;
            "context canceled".to_string()
        })
        .await
    }

    /// Invoke `service_method` and wait for the reply or for `cancel` to finish,
    /// whichever comes first.
    ///
    /// When `cancel` wins, the call is dropped from the pending registry and the error is
    /// [`RpcError::Cancelled`] carrying the string `cancel` produced. A reply arriving
    /// afterwards is discarded.
    pub async fn call_until<A, R, F>(&self, service_method: &str, args: &A, cancel: F) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
        F: Future<Output = String>,
    {
        let (done, mut receiver) = done_channel(1);
        let seq = self.go(service_method, args, Some(done)).await.seq();

        tokio::select! {
            reason = cancel => {
                self.inner.remove(seq).await;
                Err(RpcError::Cancelled(reason))
            }
            call = receiver.recv() => match call {
                Some(call) => call.reply(),
                None => Err(RpcError::Shutdown),
            },
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // The receive loop notices the cancellation, fails what is pending and exits.
        self.inner.closed.cancel();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.inner.options)
            .field("receive_finished", &self.receive_task.is_finished())
            .finish()
    }
}

impl Inner {
    async fn lock_all(
        &self,
    ) -> (
        MutexGuard<'_, PendingCalls>,
        MutexGuard<'_, Box<dyn CodecWrite>>,
    ) {
        let state = self.state.lock().await;
        let writer = self.writer.lock().await;
        (state, writer)
    }

    async fn remove(&self, seq: u64) -> Option<PendingCall> {
        self.state.lock().await.remove(seq)
    }

    /// Register `call` and write its request frame. Returns the assigned sequence number.
    async fn send<A>(&self, call: PendingCall, args: &A) -> u64
    where
        A: Serialize + ?Sized,
    {
        let body = match self.format.encode(args) {
            Ok(body) => body,
            Err(e) => {
                call.resolve(Err(e.into()));
                return 0;
            }
        };
        let header = Header::request(call.service_method(), 0);

        let registered = self.state.lock().await.register(call);
        let seq = match registered {
            Ok(seq) => seq,
            Err(call) => {
                call.resolve(Err(RpcError::Shutdown));
                return 0;
            }
        };

        let header = Header { seq, ..header };
        let written = {
            let mut writer = self.writer.lock().await;
            tokio::select! {
                _ = self.closed.cancelled() => Err(RpcError::Shutdown),
                result = writer.write(&header, body) => result.map_err(RpcError::from),
            }
        };
        if let Err(e) = written {
            warn!(
                seq,
                service_method = %header.service_method,
                error = %e,
                "Failed to write request"
            );
            // The receive loop or termination may already have resolved it.
            if let Some(call) = self.remove(seq).await {
                call.resolve(Err(e));
            }
        }
        seq
    }

    /// Await a codec read unless the client is closed first.
    async fn read<T>(
        &self,
        read: impl Future<Output = std::result::Result<T, CodecError>>,
    ) -> Result<T> {
        tokio::select! {
            _ = self.closed.cancelled() => Err(RpcError::Shutdown),
            result = read => result.map_err(RpcError::from),
        }
    }

    /// Fail every pending call with `err` and refuse new ones.
    async fn terminate(&self, err: RpcError) {
        // Abandon any stalled write first, or the writer lock below could never be taken.
        self.closed.cancel();
        let (mut state, _writer) = self.lock_all().await;
        let calls = state.shut_down();
        match &err {
            RpcError::Shutdown => debug!(pending = calls.len(), "Connection shut down"),
            err => warn!(
                pending = calls.len(),
                error = %err,
                "Connection failed, terminating calls"
            ),
        }
        for call in calls {
            call.resolve(Err(err.clone()));
        }
    }
}

/// Dispatch responses to their callers until the connection fails or is closed.
async fn receive(inner: Arc<Inner>, mut reader: Box<dyn CodecRead>) {
    let err = loop {
        let header = match inner.read(reader.read_header()).await {
            Ok(header) => header,
            Err(e) => break e,
        };

        match inner.remove(header.seq).await {
            None => {
                debug!(seq = header.seq, "Discarding response with no pending call");
                if let Err(e) = inner.read(reader.discard_body()).await {
                    break e;
                }
            }
            Some(call) if header.is_error() => {
                let discarded = inner.read(reader.discard_body()).await;
                call.resolve(Err(RpcError::Remote(header.error)));
                if let Err(e) = discarded {
                    break e;
                }
            }
            Some(call) => match inner.read(reader.read_body()).await {
                Ok(body) => call.resolve(Ok(body)),
                Err(e) => {
                    call.resolve(Err(body_error(&e)));
                    break e;
                }
            },
        }
    };

    inner.terminate(err).await;
}

fn body_error(err: &RpcError) -> RpcError {
    match err {
        RpcError::Codec(source) => RpcError::ReadBody(Arc::clone(source)),
        other => other.clone(),
    }
}

use bytes::Bytes;
use serde::de::DeserializeOwned;
use streamrpc_codec::Format;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{Result, RpcError};

/// Capacity of the completion channel allocated when the caller does not supply one.
pub const DEFAULT_DONE_CAPACITY: usize = 10;

/// Create a bounded completion channel that calls can be resolved into.
///
/// One sender may be shared by many calls; each resolved call is delivered exactly once.
/// A completion that finds the channel full is handed to a background task that waits for
/// room, so a receiver that is kept open but never drained accumulates one task per call.
///
/// # Panics
///
/// Panics if `capacity` is zero. An unbuffered completion channel is a caller bug.
pub fn done_channel(capacity: usize) -> (DoneSender, mpsc::Receiver<Call>) {
    assert!(capacity > 0, "rpc client: done channel is unbuffered");
    let (tx, rx) = mpsc::channel(capacity);
    (DoneSender { tx }, rx)
}

/// The sending side of a completion channel created by [`done_channel`].
#[derive(Debug, Clone)]
pub struct DoneSender {
    tx: mpsc::Sender<Call>,
}

impl DoneSender {
    fn deliver(self, call: Call) {
        match self.tx.try_send(call) {
            Ok(()) => {}
            // The receive loop must never block on a slow consumer.
            Err(TrySendError::Full(call)) => {
                tracing::warn!(
                    seq = call.seq,
                    capacity = self.tx.max_capacity(),
                    "Completion channel full, delivering from a background task"
                );
                tokio::spawn(async move {
                    let _ = self.tx.send(call).await;
                });
            }
            Err(TrySendError::Closed(call)) => {
                tracing::trace!(seq = call.seq, "Completion receiver gone, dropping call");
            }
        }
    }
}

/// A call that has been registered but not yet resolved.
///
/// Resolving consumes the value, so each call is completed at most once.
#[derive(Debug)]
pub(crate) struct PendingCall {
    pub(crate) seq: u64,
    service_method: String,
    format: Format,
    done: DoneSender,
}

impl PendingCall {
    pub(crate) fn new(service_method: impl Into<String>, format: Format, done: DoneSender) -> Self {
        Self {
            seq: 0,
            service_method: service_method.into(),
            format,
            done,
        }
    }

    pub(crate) fn service_method(&self) -> &str {
        &self.service_method
    }

    pub(crate) fn resolve(self, result: Result<Bytes>) {
        let call = Call {
            seq: self.seq,
            service_method: self.service_method,
            format: self.format,
            result,
        };
        self.done.deliver(call);
    }
}

/// A completed invocation, delivered through its completion channel.
#[derive(Debug)]
pub struct Call {
    /// Sequence number assigned at registration; 0 if the call was never registered.
    pub seq: u64,
    pub service_method: String,
    format: Format,
    result: Result<Bytes>,
}

impl Call {
    /// The error the call finished with, if any.
    pub fn error(&self) -> Option<&RpcError> {
        self.result.as_ref().err()
    }

    /// The raw reply body.
    pub fn reply_bytes(&self) -> Result<&Bytes> {
        self.result.as_ref().map_err(Clone::clone)
    }

    /// Decode the reply body with the connection's codec format.
    pub fn reply<R: DeserializeOwned>(&self) -> Result<R> {
        let body = self.reply_bytes()?;
        Ok(self.format.decode(body)?)
    }
}

/// Handle returned by [`crate::Client::go`].
#[derive(Debug)]
pub struct Pending {
    seq: u64,
    receiver: Option<mpsc::Receiver<Call>>,
}

impl Pending {
    pub(crate) fn new(seq: u64, receiver: Option<mpsc::Receiver<Call>>) -> Self {
        Self { seq, receiver }
    }

    /// Sequence number of the call, or 0 if it was rejected before registration.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the call on the channel the client allocated for it.
    ///
    /// Returns `None` when the caller supplied its own completion channel; the call is
    /// delivered there instead.
    pub async fn done(self) -> Option<Call> {
        self.receiver?.recv().await
    }
}

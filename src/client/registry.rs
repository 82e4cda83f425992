use std::collections::HashMap;

use crate::client::call::PendingCall;

/// In-flight calls keyed by sequence number, plus the client's terminal flags.
///
/// Both flags only ever go from false to true. Once either is set no call can be registered.
#[derive(Debug)]
pub(crate) struct PendingCalls {
    next_seq: u64,
    calls: HashMap<u64, PendingCall, ahash::RandomState>,
    closing: bool,
    shutdown: bool,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self {
            next_seq: 1,
            calls: HashMap::default(),
            closing: false,
            shutdown: false,
        }
    }

    pub(crate) fn is_available(&self) -> bool {
        !self.closing && !self.shutdown
    }

    /// Assign the next sequence number and track the call.
    ///
    /// Hands the call back when the client is closing or shut down.
    pub(crate) fn register(&mut self, mut call: PendingCall) -> Result<u64, PendingCall> {
        if !self.is_available() {
            return Err(call);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        call.seq = seq;
        self.calls.insert(seq, call);
        Ok(seq)
    }

    /// Remove a call. Removing an unknown or already removed sequence is a no-op.
    pub(crate) fn remove(&mut self, seq: u64) -> Option<PendingCall> {
        self.calls.remove(&seq)
    }

    /// Mark the client as closing. Returns false if it already was.
    pub(crate) fn begin_close(&mut self) -> bool {
        !std::mem::replace(&mut self.closing, true)
    }

    /// Mark the connection as shut down and take every remaining call.
    pub(crate) fn shut_down(&mut self) -> Vec<PendingCall> {
        self.shutdown = true;
        self.calls.drain().map(|(_, call)| call).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }
}

//! A remote-procedure-call client over a single byte-stream connection.
//!
//! Calls are written as `(header, body)` frames through a pluggable codec and their
//! replies are matched back by sequence number, so any number of calls can be in
//! flight on one connection. Connections are dialed directly or tunnelled through
//! HTTP CONNECT, selected by an address string such as `tcp@127.0.0.1:7001`.

pub mod address;
pub mod client;
pub mod error;

pub use streamrpc_codec as codec;

pub use address::{Protocol, RpcAddress};
pub use client::{Call, Client, Options, dial, dial_http, done_channel, xdial};
pub use error::{Result, RpcError};

//! Client-side types for streamrpc.
//!
//! This module contains the [`Client`] and the routines that dial, negotiate and
//! construct it.
//!
//! # Example
//!
//! ```ignore
//! use streamrpc::client::{dial, done_channel, Options};
//! use streamrpc::codec::CodecType;
//!
//! let opts = Options::default().with_codec_type(CodecType::JSON);
//! let client = dial("tcp", "127.0.0.1:7001", Some(opts)).await?;
//!
//! // Wait for a single reply
//! let sum: i32 = client.call("Arith.Sum", &(1, 2)).await?;
//!
//! // Or fan out and collect completions from one channel
//! let (done, mut completions) = done_channel(16);
//! for i in 0..16 {
//!     client.go("Arith.Sum", &(i, i), Some(done.clone())).await;
//! }
//! while let Some(call) = completions.recv().await {
//!     println!("{} -> {:?}", call.seq, call.reply::<i32>());
//! }
//! ```

mod call;
mod config;
mod connection;
mod dial;
mod registry;
mod rpc_client;

pub use call::{Call, DEFAULT_DONE_CAPACITY, DoneSender, Pending, done_channel};
pub use config::{DEFAULT_CONNECT_TIMEOUT, MAGIC_NUMBER, Options};
pub use connection::{CONNECTED, DEFAULT_RPC_PATH, PREAMBLE_LEN, new_client, new_http_client};
pub use dial::{dial, dial_http, xdial};
pub use rpc_client::Client;

//! Wire codecs for streamrpc.
//!
//! A codec turns a raw byte stream into a sequence of `(Header, body)` messages.
//! Codecs are selected per connection by a [`CodecType`] carried in the
//! connection preamble and built through the process-wide registry.
//!
//! # Example
//!
//! ```ignore
//! use streamrpc_codec::{codec_factory, CodecType, Header};
//!
//! let factory = codec_factory(CodecType::JSON).expect("json codec is built in");
//! let (mut reader, mut writer, format) = factory(Box::new(stream)).split();
//!
//! let body = format.encode(&(1, 2))?;
//! writer.write(&Header::request("Arith.Sum", 1), body).await?;
//! let header = reader.read_header().await?;
//! let reply: i32 = format.decode(&reader.read_body().await?)?;
//! ```

mod codec;
mod error;
mod format;
mod framed;
mod header;
mod registry;

pub use codec::{Codec, CodecRead, CodecWrite, Connection};
pub use error::CodecError;
pub use format::Format;
pub use framed::{FramedReader, FramedWriter, MAX_FRAME_SIZE, framed};
pub use header::Header;
pub use registry::{CodecFactory, CodecType, codec_factory, register_codec};

use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::codec::{Codec, Connection};
use crate::format::Format;
use crate::framed::framed;

/// Selector written into the connection preamble to pick a codec.
///
/// Zero is reserved for "unset" and resolves to [`CodecType::DEFAULT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodecType(pub u64);

impl CodecType {
    pub const UNSET: CodecType = CodecType(0);
    pub const BINCODE: CodecType = CodecType(1);
    pub const JSON: CodecType = CodecType(2);
    pub const DEFAULT: CodecType = CodecType::BINCODE;

    pub fn is_unset(&self) -> bool {
        *self == CodecType::UNSET
    }
}

impl fmt::Display for CodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds a codec over a freshly negotiated connection.
pub type CodecFactory = Arc<dyn Fn(Box<dyn Connection>) -> Codec + Send + Sync + 'static>;

static REGISTRY: LazyLock<DashMap<CodecType, CodecFactory, ahash::RandomState>> =
    LazyLock::new(|| {
        let map = DashMap::default();
        map.insert(CodecType::BINCODE, framed_factory(Format::Bincode));
        map.insert(CodecType::JSON, framed_factory(Format::Json));
        map
    });

fn framed_factory(format: Format) -> CodecFactory {
    Arc::new(move |conn| framed(conn, format))
}

/// Register a codec factory under `codec_type`, replacing any previous one.
///
/// Returns false when `codec_type` is [`CodecType::UNSET`], which can never be selected.
pub fn register_codec<F>(codec_type: CodecType, factory: F) -> bool
where
    F: Fn(Box<dyn Connection>) -> Codec + Send + Sync + 'static,
{
    if codec_type.is_unset() {
        return false;
    }
    REGISTRY.insert(codec_type, Arc::new(factory));
    tracing::debug!(%codec_type, "Registered codec factory");
    true
}

/// Look up the factory for `codec_type`.
pub fn codec_factory(codec_type: CodecType) -> Option<CodecFactory> {
    REGISTRY.get(&codec_type).map(|entry| Arc::clone(entry.value()))
}

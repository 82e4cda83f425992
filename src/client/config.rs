use std::time::Duration;

use streamrpc_codec::CodecType;

/// Value that opens every connection preamble.
pub const MAGIC_NUMBER: u64 = 0x3bef5c;

/// Default time allowed for connecting and negotiating.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-connection options negotiated in the preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Protocol identifier. Always reset to [`MAGIC_NUMBER`] when options are resolved.
    pub magic_number: u64,

    /// Codec used for every message on the connection.
    pub codec_type: CodecType,

    /// Time allowed to connect and negotiate. Zero waits forever.
    pub connect_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            magic_number: MAGIC_NUMBER,
            codec_type: CodecType::DEFAULT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Options {
    /// Set the codec type.
    pub fn with_codec_type(mut self, codec_type: CodecType) -> Self {
        self.codec_type = codec_type;
        self
    }

    /// Set the connect timeout. `Duration::ZERO` disables the timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Apply protocol invariants to caller-supplied options.
    ///
    /// Missing options resolve to the defaults. The magic number is always the canonical
    /// one and an unset codec type falls back to [`CodecType::DEFAULT`].
    pub fn resolve(opts: Option<Options>) -> Options {
        let Some(mut opts) = opts else {
            return Options::default();
        };
        opts.magic_number = MAGIC_NUMBER;
        if opts.codec_type.is_unset() {
            opts.codec_type = CodecType::DEFAULT;
        }
        opts
    }

    /// The connect timeout as the integer written into the preamble (nanoseconds).
    pub(crate) fn connect_timeout_units(&self) -> u64 {
        u64::try_from(self.connect_timeout.as_nanos()).unwrap_or(u64::MAX)
    }
}

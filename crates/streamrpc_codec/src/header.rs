use serde::{Deserialize, Serialize};

/// Per-call metadata carried in front of every request and response body.
///
/// `service_method` has the form `Service.Method`. An empty `error` means the call
/// succeeded; a response with a non-empty `error` still carries a (discarded) body frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub service_method: String,
    pub seq: u64,
    pub error: String,
}

impl Header {
    pub fn request(service_method: impl Into<String>, seq: u64) -> Self {
        Self {
            service_method: service_method.into(),
            seq,
            error: String::new(),
        }
    }

    /// Returns true when the header reports a remote failure.
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

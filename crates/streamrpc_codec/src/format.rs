use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// Serialization format a codec uses for headers and bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    Json,
    Bincode,
}

impl Format {
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, CodecError> {
        let buf = match self {
            Format::Json => {
                serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))?
            }
            Format::Bincode => {
                bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))?
            }
        };
        Ok(Bytes::from(buf))
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Format::Json => {
                serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
            }
            Format::Bincode => {
                bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Header;

    #[test]
    fn test_json_header_is_readable() {
        let header = Header::request("Arith.Sum", 7);
        let bytes = Format::Json.encode(&header).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("\"service_method\":\"Arith.Sum\""));
        assert!(text.contains("\"seq\":7"));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result = Format::Json.decode::<Header>(b"not json");
        assert!(matches!(result, Err(CodecError::Decode(_))));

        let result = Format::Bincode.decode::<Header>(&[0xff]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_bincode_preserves_error_text() {
        let header = Header {
            service_method: "Arith.Div".to_string(),
            seq: 3,
            error: "divide by zero".to_string(),
        };
        let bytes = Format::Bincode.encode(&header).unwrap();
        let decoded: Header = Format::Bincode.decode(&bytes).unwrap();
        assert!(decoded.is_error());
        assert_eq!(decoded, header);
    }
}

//! Codecs used to freeze values for cache storage.
//!
//! The only contract is the round trip: `decode(encode(x)) == x` for every
//! value the codec accepts.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tandem_common::error::{TandemError, TandemResult};

/// Turns serde values into cache payloads and back.
pub trait Codec: Send + Sync {
    /// Codec name used in logs.
    fn name(&self) -> &'static str;

    /// Encodes a value.
    fn encode<T: Serialize>(&self, value: &T) -> TandemResult<Bytes>;

    /// Decodes a value.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> TandemResult<T>;
}

/// Human-readable JSON payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> TandemResult<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| TandemError::serialization(format!("json encode: {e}")))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> TandemResult<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| TandemError::serialization(format!("json decode: {e}")))
    }
}

/// Compact binary payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn encode<T: Serialize>(&self, value: &T) -> TandemResult<Bytes> {
        bincode::serialize(value)
            .map(Bytes::from)
            .map_err(|e| TandemError::serialization(format!("bincode encode: {e}")))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> TandemResult<T> {
        bincode::deserialize(bytes)
            .map_err(|e| TandemError::serialization(format!("bincode decode: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        key: Option<String>,
        fields: BTreeMap<String, i64>,
    }

    fn payload() -> Payload {
        Payload {
            key: Some("users:5".to_string()),
            fields: BTreeMap::from([("age".to_string(), 27), ("id".to_string(), 5)]),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let bytes = JsonCodec.encode(&payload()).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("\"age\":27"));
        let back: Payload = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(back, payload());
    }

    #[test]
    fn test_binary_round_trip() {
        let bytes = BinaryCodec.encode(&payload()).unwrap();
        let back: Payload = BinaryCodec.decode(&bytes).unwrap();
        assert_eq!(back, payload());
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        let err = JsonCodec.decode::<Payload>(b"not json").unwrap_err();
        assert_eq!(err.code(), tandem_common::ErrorCode::Serialization);

        let err = BinaryCodec.decode::<Payload>(&[0xff]).unwrap_err();
        assert_eq!(err.code(), tandem_common::ErrorCode::Serialization);
    }
}

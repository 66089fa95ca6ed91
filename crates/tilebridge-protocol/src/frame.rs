//! Frame codec: text frames parse directly, binary frames are
//! zlib-inflated first.

use std::io::Read;

use flate2::read::ZlibDecoder;
use serde::Serialize;
use serde_json::Value;

use crate::ProtocolError;

/// Parses a text frame as a JSON packet.
pub fn decode_text(text: &str) -> Result<Value, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

/// Inflates a zlib-compressed binary frame and parses the result.
pub fn decode_binary(data: &[u8]) -> Result<Value, ProtocolError> {
    let mut inflated = String::new();
    ZlibDecoder::new(data)
        .read_to_string(&mut inflated)
        .map_err(ProtocolError::Inflate)?;
    serde_json::from_str(&inflated).map_err(ProtocolError::Decode)
}

/// Serializes a packet for the wire.
pub fn encode<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(value).map_err(ProtocolError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(text: &str) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).expect("write");
        encoder.finish().expect("finish")
    }

    #[test]
    fn test_decode_text_parses_plain_json() {
        let value = decode_text(r#"{"m":5,"t":123}"#).expect("should parse");
        assert_eq!(value["m"], 5);
        assert_eq!(value["t"], 123);
    }

    #[test]
    fn test_decode_binary_inflates_then_parses() {
        let compressed = deflate(r#"{"m":1,"r":2,"t":[]}"#);
        let value = decode_binary(&compressed).expect("should inflate");
        assert_eq!(value["m"], 1);
        assert_eq!(value["r"], 2);
    }

    #[test]
    fn test_decode_binary_rejects_garbage() {
        let result = decode_binary(b"definitely not zlib");
        assert!(matches!(result, Err(ProtocolError::Inflate(_))));
    }

    #[test]
    fn test_decode_text_rejects_malformed_json() {
        let result = decode_text("{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_round_trips_through_decode() {
        let value = serde_json::json!({"m": 2, "r": 14, "v": 3});
        let text = encode(&value).expect("encode");
        let back = decode_text(&text).expect("decode");
        assert_eq!(back, value);
    }
}

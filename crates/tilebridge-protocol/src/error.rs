/// Errors that can occur in the protocol layer.
///
/// Malformed traffic is never fatal to a session — callers log the
/// error, drop the frame, and carry on.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a value into a frame).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A frame was not valid JSON, or not the expected shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A binary frame did not inflate as a zlib stream.
    #[error("inflate failed: {0}")]
    Inflate(std::io::Error),
}

//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, wrong types, or a
    /// truncated frame.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message deserialized but violates protocol rules, e.g. a
    /// state-bearing update without a version.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

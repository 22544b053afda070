//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire frames.
///
/// Each crate in the workspace defines its own error enum, so a
/// `ProtocolError` always means "the bytes were wrong", never "the draft
/// was in the wrong state".
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event name,
    /// a missing field, or a field of the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule, e.g. an event that
    /// needs a draft id arrived without one.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

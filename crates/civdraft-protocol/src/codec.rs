//! Codec trait and the JSON implementation.
//!
//! The protocol layer doesn't care how frames are serialized, only that
//! something implements [`Codec`]. Browser clients speak JSON, so
//! [`JsonCodec`] is the one the server uses.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into an owned value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use civdraft_protocol::{ClientEnvelope, ClientEvent, Codec, DraftId, JsonCodec};
///
/// let codec = JsonCodec;
/// let env = ClientEnvelope::new(DraftId::new("42"), ClientEvent::Refill);
/// let bytes = codec.encode(&env).unwrap();
/// let decoded: ClientEnvelope = codec.decode(&bytes).unwrap();
/// assert_eq!(env, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CardId, ClientEnvelope, ClientEvent, DraftId, ServerEvent};

    #[test]
    fn test_json_codec_decodes_client_frame() {
        let codec = JsonCodec;
        let raw = br#"{"draft_id":"5","event":"timer expired","client_turn":9}"#;
        let env: ClientEnvelope = codec.decode(raw).unwrap();
        assert_eq!(env.event, ClientEvent::TimerExpired { client_turn: 9 });
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let codec = JsonCodec;
        let result: Result<ClientEnvelope, _> = codec.decode(b"not json {{{");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_wrong_field_type_returns_decode_error() {
        let codec = JsonCodec;
        let raw = br#"{"draft_id":"5","event":"end turn","pick":"seven","client_turn":0}"#;
        let result: Result<ClientEnvelope, _> = codec.decode(raw);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encodes_server_event_as_text_json() {
        let codec = JsonCodec;
        let event: ServerEvent<()> = ServerEvent::DraftNotFound(DraftId::new("404"));
        let bytes = codec.encode(&event).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("draft not found"));
        assert!(text.contains("404"));
    }

    #[test]
    fn test_json_codec_end_turn_round_trip() {
        let codec = JsonCodec;
        let env = ClientEnvelope::new(
            DraftId::new("1"),
            ClientEvent::EndTurn {
                pick: CardId(3),
                client_turn: 0,
            },
        );
        let decoded: ClientEnvelope = codec.decode(&codec.encode(&env).unwrap()).unwrap();
        assert_eq!(env, decoded);
    }
}

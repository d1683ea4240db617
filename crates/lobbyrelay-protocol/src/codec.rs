//! Codec trait and the JSON implementation.
//!
//! The relay speaks JSON text frames today, but nothing above this module
//! depends on that: the server holds a `C: Codec` and only ever calls
//! [`Codec::encode`] and [`Codec::decode`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts packets to and from raw frame bytes.
///
/// `Send + Sync + 'static` because the codec is held by the relay task for
/// the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into frame bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes frame bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed input, unknown
    /// message tags or missing fields.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use lobbyrelay_protocol::{ClientPacket, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = br#"{"message": 1, "id": 9}"#;
///
/// let envelope: Envelope<ClientPacket> = codec.decode(bytes).unwrap();
/// assert_eq!(envelope.id, 9);
/// assert_eq!(envelope.packet, ClientPacket::LobbyList);
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

//! Error types for the protocol layer.
//!
//! Every variant here is a "protocol error" in the relay's taxonomy: the
//! offending frame is discarded and logged, and the connection stays open.

use crate::MessageKind;

/// Errors raised while encoding or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes were not valid JSON, or the JSON did not match a packet.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A field every packet carries (`message`, `id`) is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The `message` tag does not name any known packet.
    #[error("unknown message tag {0}")]
    UnknownMessage(String),

    /// The tag is known but not valid in this direction (e.g. a client
    /// sending `Host`, which only the relay emits).
    #[error("message {0} is not accepted in this direction")]
    UnexpectedMessage(MessageKind),

    /// The variant-specific fields for `kind` are missing or malformed.
    #[error("invalid {kind} packet: {source}")]
    Fields {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },

    /// Structurally invalid packet (not an object, non-integer id, ...).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

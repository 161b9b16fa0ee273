//! Error types for the protocol layer.
//!
//! Each crate in Teamquiz defines its own error enum, so a
//! `ProtocolError` always means serialization went wrong, not networking
//! or game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown event type,
    /// missing fields or wrong field types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame could not be interpreted at all, e.g. a binary frame
    /// where text was expected.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

//! Unified error type for the Teamquiz server.

use teamquiz_protocol::ProtocolError;
use teamquiz_room::RoomError;
use teamquiz_session::SessionError;
use teamquiz_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TeamquizError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, binding).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, full, not host, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Binding or serving the admin listener failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Startup configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamquiz_protocol::RoomCode;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::HandshakeTimeout;
        let wrapped: TeamquizError = err.into();
        assert!(matches!(wrapped, TeamquizError::Transport(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let wrapped: TeamquizError = err.into();
        assert!(matches!(wrapped, TeamquizError::Protocol(_)));
        assert!(wrapped.to_string().contains("bad"));
    }

    #[test]
    fn test_from_session_error() {
        let wrapped: TeamquizError = SessionError::Unauthorized.into();
        assert!(matches!(wrapped, TeamquizError::Session(_)));
    }

    #[test]
    fn test_room_error_display_passes_through() {
        let wrapped: TeamquizError = RoomError::NotFound(RoomCode::new("abcd")).into();
        assert_eq!(wrapped.to_string(), "room ABCD not found");
    }
}

//! Error types for the session layer.

use teamquiz_protocol::ParticipantId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The admin token was missing, wrong, or no token is configured.
    #[error("unauthorised")]
    Unauthorized,

    /// No session exists for the given participant.
    #[error("session not found for participant {0}")]
    NotFound(ParticipantId),

    /// The connection is already in a room and cannot bind again.
    #[error("already in a room")]
    AlreadyBound,

    /// A session for this participant is already open.
    #[error("participant {0} already has an open session")]
    AlreadyOpen(ParticipantId),
}

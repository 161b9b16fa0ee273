//! Error types for the room layer.
//!
//! The `Display` text of a [`RoomError`] is exactly what the initiating
//! connection receives in its `rejection` message, so keep it short and
//! human-readable.

use teamquiz_protocol::{RoomCode, Team};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The roster is at `maxPlayers`.
    #[error("room is full")]
    RoomFull,

    /// Both teams are at `teamSize`.
    #[error("both teams are full")]
    TeamsFull,

    /// Joins are locked by the host or an admin.
    #[error("room is locked")]
    Locked,

    /// The participant is already on this room's roster.
    #[error("already joined this room")]
    AlreadyJoined,

    /// A privileged action came from a connection other than the host.
    #[error("only the host can do that")]
    NotHost,

    /// A round start arrived while a question is still open.
    #[error("a question is already open")]
    QuestionOpen,

    /// The question failed validation.
    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    /// No player with the given id (or name) is in the room.
    #[error("player not found")]
    PlayerNotFound,

    /// Moving a player would push a team over `teamSize`.
    #[error("team {0} is full")]
    TeamFull(Team),

    /// The bank holds no question matching the request.
    #[error("no question available{}", .0.as_deref().map(|c| format!(" in category {c}")).unwrap_or_default())]
    BankEmpty(Option<String>),

    /// The room's command channel is closed (room shutting down).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

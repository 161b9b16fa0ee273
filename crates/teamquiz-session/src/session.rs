//! Session types: what the server knows about one connection.

use teamquiz_protocol::{ParticipantId, RoomCode};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// What a connection is doing in its room.
///
/// ```text
///   Unbound ──create-session──→ Host
///      │
///      ├──────join────────────→ Player
///      │
///      └──────watch───────────→ Spectator
/// ```
///
/// A connection binds at most once. Leaving a room (kick, room ended)
/// sends it back to `Unbound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unbound,
    Host,
    Player,
    Spectator,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The server's record of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Which participant this session belongs to.
    pub participant: ParticipantId,

    /// Current role.
    pub role: Role,

    /// Room the connection is bound to. `None` exactly when `Unbound`.
    pub room: Option<RoomCode>,
}

impl Session {
    /// A fresh, unbound session.
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            role: Role::Unbound,
            room: None,
        }
    }

    /// Whether the connection is bound to a room.
    pub fn is_bound(&self) -> bool {
        self.room.is_some()
    }
}

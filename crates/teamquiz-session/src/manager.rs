//! The session manager: tracks every open connection and its binding.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain `HashMap` wrapper and is not thread-safe by
//! itself. The server keeps it behind a `tokio::sync::Mutex` and only
//! holds the lock for a lookup or an update, never across a room command.

use std::collections::HashMap;

use teamquiz_protocol::{ParticipantId, RoomCode};

use crate::{Role, Session, SessionError};

/// Manages all open connection sessions.
///
/// ## Lifecycle
///
/// ```text
/// open() ──→ bind() ──→ unbind() / unbind_room() ──→ close()
///   │                                                  ▲
///   └──────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<ParticipantId, Session>,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection as `Unbound`.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyOpen`] if the id is already in use.
    pub fn open(&mut self, participant: ParticipantId) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&participant) {
            return Err(SessionError::AlreadyOpen(participant));
        }
        tracing::debug!(%participant, "session opened");
        Ok(self
            .sessions
            .entry(participant)
            .or_insert_with(|| Session::new(participant)))
    }

    /// Binds an unbound connection to a room in the given role.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if the connection was never opened
    /// - [`SessionError::AlreadyBound`] if it is already in a room
    pub fn bind(
        &mut self,
        participant: ParticipantId,
        role: Role,
        room: RoomCode,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&participant)
            .ok_or(SessionError::NotFound(participant))?;
        if session.is_bound() {
            return Err(SessionError::AlreadyBound);
        }
        tracing::debug!(%participant, ?role, code = %room, "session bound");
        session.role = role;
        session.room = Some(room);
        Ok(())
    }

    /// Sends one connection back to `Unbound`, returning the room it left.
    pub fn unbind(&mut self, participant: ParticipantId) -> Option<RoomCode> {
        let session = self.sessions.get_mut(&participant)?;
        session.role = Role::Unbound;
        session.room.take()
    }

    /// Unbinds one connection only if it is still bound to `code`.
    ///
    /// Returns whether it was unbound.
    pub fn unbind_from(&mut self, participant: ParticipantId, code: &RoomCode) -> bool {
        match self.sessions.get_mut(&participant) {
            Some(session) if session.room.as_ref() == Some(code) => {
                session.role = Role::Unbound;
                session.room = None;
                true
            }
            _ => false,
        }
    }

    /// Unbinds every connection bound to `code`; used when a room ends.
    ///
    /// Returns the participants that were unbound.
    pub fn unbind_room(&mut self, code: &RoomCode) -> Vec<ParticipantId> {
        let mut unbound = Vec::new();
        for session in self.sessions.values_mut() {
            if session.room.as_ref() == Some(code) {
                session.role = Role::Unbound;
                session.room = None;
                unbound.push(session.participant);
            }
        }
        unbound
    }

    /// Removes a session when its connection goes away, returning it so
    /// the caller can clean up the room it was bound to.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn close(&mut self, participant: ParticipantId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&participant)
            .ok_or(SessionError::NotFound(participant))?;
        tracing::debug!(%participant, role = ?session.role, "session closed");
        Ok(session)
    }

    /// Looks up a session.
    pub fn get(&self, participant: &ParticipantId) -> Option<&Session> {
        self.sessions.get(participant)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no open sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> ParticipantId {
        ParticipantId(id)
    }

    fn code(s: &str) -> RoomCode {
        RoomCode::new(s)
    }

    // =====================================================================
    // open() / close()
    // =====================================================================

    #[test]
    fn test_open_creates_unbound_session() {
        let mut mgr = SessionManager::new();
        let session = mgr.open(pid(1)).unwrap();
        assert_eq!(session.role, Role::Unbound);
        assert!(!session.is_bound());
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_open_twice_fails() {
        let mut mgr = SessionManager::new();
        mgr.open(pid(1)).unwrap();
        assert!(matches!(
            mgr.open(pid(1)),
            Err(SessionError::AlreadyOpen(p)) if p == pid(1)
        ));
    }

    #[test]
    fn test_close_returns_session_for_cleanup() {
        let mut mgr = SessionManager::new();
        mgr.open(pid(1)).unwrap();
        mgr.bind(pid(1), Role::Host, code("ABCD")).unwrap();

        let closed = mgr.close(pid(1)).unwrap();
        assert_eq!(closed.role, Role::Host);
        assert_eq!(closed.room, Some(code("ABCD")));
        assert!(mgr.is_empty());
        assert!(matches!(mgr.close(pid(1)), Err(SessionError::NotFound(_))));
    }

    // =====================================================================
    // bind() / unbind()
    // =====================================================================

    #[test]
    fn test_bind_sets_role_and_room() {
        let mut mgr = SessionManager::new();
        mgr.open(pid(1)).unwrap();
        mgr.bind(pid(1), Role::Player, code("abcd")).unwrap();

        let s = mgr.get(&pid(1)).unwrap();
        assert_eq!(s.role, Role::Player);
        assert_eq!(s.room, Some(code("ABCD")));
    }

    #[test]
    fn test_unbind_from_only_releases_matching_room() {
        let mut mgr = SessionManager::new();
        mgr.open(pid(1)).unwrap();
        mgr.bind(pid(1), Role::Player, code("ABCD")).unwrap();

        assert!(!mgr.unbind_from(pid(1), &code("WXYZ")));
        assert!(mgr.get(&pid(1)).unwrap().is_bound());

        assert!(mgr.unbind_from(pid(1), &code("ABCD")));
        let s = mgr.get(&pid(1)).unwrap();
        assert_eq!(s.role, Role::Unbound);
        assert!(!s.is_bound());
        assert!(!mgr.unbind_from(pid(2), &code("ABCD")));
    }

    #[test]
    fn test_bind_twice_is_rejected() {
        let mut mgr = SessionManager::new();
        mgr.open(pid(1)).unwrap();
        mgr.bind(pid(1), Role::Player, code("ABCD")).unwrap();
        assert!(matches!(
            mgr.bind(pid(1), Role::Spectator, code("WXYZ")),
            Err(SessionError::AlreadyBound)
        ));
    }

    #[test]
    fn test_bind_unknown_participant_fails() {
        let mut mgr = SessionManager::new();
        assert!(matches!(
            mgr.bind(pid(9), Role::Player, code("ABCD")),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_unbind_allows_rebinding() {
        let mut mgr = SessionManager::new();
        mgr.open(pid(1)).unwrap();
        mgr.bind(pid(1), Role::Player, code("ABCD")).unwrap();

        assert_eq!(mgr.unbind(pid(1)), Some(code("ABCD")));
        assert_eq!(mgr.get(&pid(1)).unwrap().role, Role::Unbound);
        assert!(mgr.bind(pid(1), Role::Player, code("WXYZ")).is_ok());
    }

    #[test]
    fn test_unbind_room_only_touches_that_room() {
        let mut mgr = SessionManager::new();
        for id in 1..=4 {
            mgr.open(pid(id)).unwrap();
        }
        mgr.bind(pid(1), Role::Host, code("ABCD")).unwrap();
        mgr.bind(pid(2), Role::Player, code("ABCD")).unwrap();
        mgr.bind(pid(3), Role::Spectator, code("ABCD")).unwrap();
        mgr.bind(pid(4), Role::Player, code("WXYZ")).unwrap();

        let mut unbound = mgr.unbind_room(&code("ABCD"));
        unbound.sort();
        assert_eq!(unbound, vec![pid(1), pid(2), pid(3)]);
        assert!(mgr.get(&pid(4)).unwrap().is_bound());
    }
}

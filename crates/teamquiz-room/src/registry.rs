//! Session registry: creates, tracks, and tears down rooms by code.

use std::collections::HashMap;

use rand::Rng;
use teamquiz_protocol::{ParticipantId, Question, RoomCode};

use crate::bank::{BankSummary, QuestionBank};
use crate::room::spawn_room;
use crate::{ParticipantSender, RoomConfig, RoomError, RoomHandle};

/// Characters used in generated room codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Attempts per code length before generating longer codes.
const CODE_ATTEMPTS: usize = 32;

/// Owns every live room and its question bank.
///
/// Constructed once at startup and injected into the server state; tests
/// build their own isolated instances. The banks live here rather than in
/// the room actors, so a CSV upload never waits on (or blocks) live play.
pub struct SessionRegistry {
    /// Live rooms, keyed by code.
    rooms: HashMap<RoomCode, RoomHandle>,

    /// Per-room question banks. Absent until the first upload.
    banks: HashMap<RoomCode, QuestionBank>,

    config: RoomConfig,
}

impl SessionRegistry {
    /// Creates an empty registry that spawns rooms with `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            banks: HashMap::new(),
            config,
        }
    }

    /// The config new rooms are spawned with.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Allocates a fresh room with `host` as its host and returns its code
    /// and handle.
    ///
    /// Codes are random and checked against live rooms until unused.
    pub fn create_session(
        &mut self,
        host: ParticipantId,
        host_sender: ParticipantSender,
    ) -> (RoomCode, RoomHandle) {
        let code = self.unused_code();
        let handle = spawn_room(code.clone(), host, host_sender, &self.config);
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(%code, %host, rooms = self.rooms.len(), "room created");
        (code, handle)
    }

    /// Returns a handle to the room, if it exists.
    pub fn get_session(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).cloned()
    }

    /// Like [`get_session`](Self::get_session) but with a typed error.
    pub fn require(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.get_session(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Removes the room and its bank without stopping the actor.
    ///
    /// The caller sends [`RoomHandle::shutdown`] on the returned handle,
    /// typically after releasing the lock guarding this registry.
    pub fn remove_session(&mut self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        let handle = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        self.banks.remove(code);
        tracing::info!(%code, rooms = self.rooms.len(), "room removed");
        Ok(handle)
    }

    /// Removes the room and its bank, and tells the actor to end the
    /// session. The actor broadcasts `session-ended` and stops its timer.
    pub async fn destroy_session(&mut self, code: &RoomCode) -> Result<(), RoomError> {
        let handle = self.remove_session(code)?;
        let _ = handle.shutdown().await;
        Ok(())
    }

    /// Replaces the room's bank wholesale and reports what it now holds.
    pub fn replace_bank(
        &mut self,
        code: &RoomCode,
        bank: QuestionBank,
    ) -> Result<BankSummary, RoomError> {
        if !self.rooms.contains_key(code) {
            return Err(RoomError::NotFound(code.clone()));
        }
        let summary = bank.summary();
        self.banks.insert(code.clone(), bank);
        tracing::info!(%code, loaded = summary.loaded, "question bank replaced");
        Ok(summary)
    }

    /// Removes and returns the next bank question matching `category`.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room doesn't exist
    /// - [`RoomError::BankEmpty`] if nothing matches; the bank is unchanged
    pub fn draw_next(
        &mut self,
        code: &RoomCode,
        category: Option<&str>,
    ) -> Result<Question, RoomError> {
        if !self.rooms.contains_key(code) {
            return Err(RoomError::NotFound(code.clone()));
        }
        self.banks
            .get_mut(code)
            .and_then(|bank| bank.draw(category))
            .ok_or_else(|| RoomError::BankEmpty(category.map(str::to_owned)))
    }

    /// Puts a drawn question back at the head of the room's bank. Dropped
    /// silently if the room (and so its bank) is gone.
    pub fn return_to_bank(&mut self, code: &RoomCode, question: Question) {
        if let Some(bank) = self.banks.get_mut(code) {
            bank.push_front(question);
        }
    }

    /// Number of questions left in the room's bank.
    pub fn bank_len(&self, code: &RoomCode) -> usize {
        self.banks.get(code).map_or(0, QuestionBank::len)
    }

    /// Returns cloned handles to all live rooms.
    ///
    /// Lets callers run async room commands without holding the registry
    /// lock.
    pub fn room_handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    /// Returns the number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn unused_code(&self) -> RoomCode {
        let mut rng = rand::rng();
        let mut len = self.config.code_len.max(RoomCode::MIN_LEN);
        loop {
            for _ in 0..CODE_ATTEMPTS {
                let raw: String = (0..len)
                    .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
                    .collect();
                let code = RoomCode::new(raw);
                if !self.rooms.contains_key(&code) {
                    return code;
                }
            }
            tracing::warn!(len, "room code space crowded, lengthening codes");
            len += 1;
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

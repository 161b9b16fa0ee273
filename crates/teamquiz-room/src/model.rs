//! The Room/Player data model.
//!
//! Plain data, no behaviour beyond projections. All mutation goes through
//! [`crate::engine`], and only ever from inside the owning room actor.

use teamquiz_protocol::{
    GameSettings, ParticipantId, Question, RosterEntry, RoomCode, Team, TeamScores,
};

/// One participant on the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: ParticipantId,
    pub name: String,
    pub score: i64,
    /// Assigned at join time; changed only by an admin swap.
    pub team: Team,
    /// Reset at every round start; set by the first accepted answer.
    pub answered_this_round: bool,
    /// Join time in milliseconds since the Unix epoch. Informational.
    pub joined_at: u64,
}

impl Player {
    /// Public projection.
    pub fn entry(&self) -> RosterEntry {
        RosterEntry {
            id: self.id,
            name: self.name.clone(),
            score: self.score,
            team: self.team,
        }
    }
}

/// One isolated quiz game.
///
/// Invariants, maintained by the engine:
/// - each team holds at most `settings.team_size` players and the roster
///   at most `settings.max_players`
/// - `in_question` implies `question.is_some()`
/// - `team_scores` only changes inside `engine::score_answer`
#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    pub host: ParticipantId,
    /// Players in join order.
    pub players: Vec<Player>,
    /// Number of rounds started so far.
    pub round: u64,
    pub in_question: bool,
    /// The current question, kept after it closes as the "last question".
    pub question: Option<Question>,
    pub settings: GameSettings,
    pub lock_joins: bool,
    pub team_scores: TeamScores,
}

impl Room {
    /// Looks up a player by id.
    pub fn player(&self, id: ParticipantId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub(crate) fn player_mut(&mut self, id: ParticipantId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Number of players currently on `team`.
    pub fn team_count(&self, team: Team) -> usize {
        self.players.iter().filter(|p| p.team == team).count()
    }
}

//! Core value types shared by every layer: identities, teams, settings,
//! questions, and the public (scrubbed) views sent to clients.
//!
//! Anything in this module may travel on the wire, so field names are
//! pinned with serde attributes to the camelCase shape clients expect.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a connected participant.
///
/// It is the connection id handed out by the transport, so it doubles as
/// the routing address for direct messages. Serialized as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Short human-readable room code, e.g. `"QZ4K"`.
///
/// Codes are case-insensitive for humans, so every constructor
/// normalizes to trimmed upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Minimum accepted length of a client-supplied code.
    pub const MIN_LEN: usize = 3;

    /// Builds a code from client input, normalizing case and whitespace.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Teams and scores
// ---------------------------------------------------------------------------

/// One of the two fixed teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// The opposing team.
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Aggregate score per team. Serialized as `{"A": 10, "B": -5}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
}

impl TeamScores {
    /// Score of a single team.
    pub fn get(&self, team: Team) -> i64 {
        match team {
            Team::A => self.a,
            Team::B => self.b,
        }
    }

    /// Applies a signed delta to one team's total.
    pub fn add(&mut self, team: Team, delta: i64) {
        match team {
            Team::A => self.a = self.a.saturating_add(delta),
            Team::B => self.b = self.b.saturating_add(delta),
        }
    }

    /// The team ahead, or a tie.
    pub fn leader(&self) -> WinningTeam {
        match self.a.cmp(&self.b) {
            std::cmp::Ordering::Greater => WinningTeam::A,
            std::cmp::Ordering::Less => WinningTeam::B,
            std::cmp::Ordering::Equal => WinningTeam::Tie,
        }
    }
}

/// Final outcome announced when the host ends the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinningTeam {
    A,
    B,
    #[serde(rename = "TIE")]
    Tie,
}

// ---------------------------------------------------------------------------
// GameSettings
// ---------------------------------------------------------------------------

/// Immutable game configuration, snapshotted into every room at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Total roster capacity across both teams.
    pub max_players: usize,
    /// Capacity of each team.
    pub team_size: usize,
    /// Informational target number of rounds.
    pub rounds: u32,
    /// Delta applied for a correct answer (positive).
    pub points_correct: i64,
    /// Delta applied for a wrong answer (zero or negative).
    pub points_wrong: i64,
    /// Length of the answer window.
    pub question_seconds: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: 10,
            team_size: 5,
            rounds: 10,
            points_correct: 10,
            points_wrong: -5,
            question_seconds: 15,
        }
    }
}

impl GameSettings {
    /// Largest magnitude accepted for `pointsCorrect` and `pointsWrong`.
    pub const MAX_POINTS: i64 = 1_000_000;

    /// Checks the settings for values that would make a room unplayable.
    pub fn validate(&self) -> Result<(), String> {
        if self.team_size == 0 {
            return Err("teamSize must be at least 1".into());
        }
        if self.max_players == 0 {
            return Err("maxPlayers must be at least 1".into());
        }
        if self.question_seconds == 0 {
            return Err("questionSeconds must be at least 1".into());
        }
        if self.points_correct < 0 {
            return Err("pointsCorrect must not be negative".into());
        }
        if self.points_wrong > 0 {
            return Err("pointsWrong must not be positive".into());
        }
        if self.points_correct > Self::MAX_POINTS || self.points_wrong < -Self::MAX_POINTS {
            return Err(format!(
                "points must be within ±{} per answer",
                Self::MAX_POINTS
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// A multiple-choice question, including its answer.
///
/// Never send this to players or spectators; use [`QuestionView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Question {
    /// Validates shape: non-empty prompt, at least two options, and a
    /// correct index that points at one of them.
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("question text is empty".into());
        }
        if self.options.len() < 2 {
            return Err(format!(
                "question needs at least 2 options, got {}",
                self.options.len()
            ));
        }
        if self.correct_index >= self.options.len() {
            return Err(format!(
                "correctIndex {} is out of range for {} options",
                self.correct_index,
                self.options.len()
            ));
        }
        Ok(())
    }

    /// The public projection without the answer.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            text: self.text.clone(),
            options: self.options.clone(),
            category: self.category.clone(),
        }
    }
}

/// A question as shown to non-administrative clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Public views
// ---------------------------------------------------------------------------

/// Public projection of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: ParticipantId,
    pub name: String,
    pub score: i64,
    pub team: Team,
}

/// Scrubbed room snapshot: sent on round start and served by `GET /state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub round: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub seconds_left: u32,
    pub in_question: bool,
    pub team_scores: TeamScores,
    pub roster: Vec<RosterEntry>,
}

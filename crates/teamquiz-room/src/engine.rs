//! Game engine: pure state transitions over a [`Room`].
//!
//! No I/O and no channels; the only clock read is a player's
//! informational join time. Every function takes the room by reference
//! and either mutates it or projects it. The room actor is the
//! only caller in production, which is what makes the check-then-set in
//! [`score_answer`] atomic.

use std::time::{SystemTime, UNIX_EPOCH};

use teamquiz_protocol::{
    GameSettings, ParticipantId, Question, RosterEntry, RoomCode, Team, TeamScores,
};

use crate::model::{Player, Room};
use crate::RoomError;

/// Result of [`score_answer`]. Only `Scored` changed any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Scored { correct: bool, delta: i64 },
    NoOpenQuestion,
    UnknownPlayer,
    AlreadyAnswered,
}

impl AnswerOutcome {
    /// Why nothing was scored, or `None` if the answer counted.
    pub fn ignored_reason(&self) -> Option<&'static str> {
        match self {
            Self::Scored { .. } => None,
            Self::NoOpenQuestion => Some("no question is open"),
            Self::UnknownPlayer => Some("not a player in this room"),
            Self::AlreadyAnswered => Some("already answered this round"),
        }
    }
}

/// A fresh room: empty roster, zeroed scores, unlocked, no question.
pub fn create_room(code: RoomCode, host: ParticipantId, settings: GameSettings) -> Room {
    Room {
        code,
        host,
        players: Vec::new(),
        round: 0,
        in_question: false,
        question: None,
        settings,
        lock_joins: false,
        team_scores: TeamScores::default(),
    }
}

/// Adds a player, filling team A first and then team B.
///
/// # Errors
/// - [`RoomError::Locked`] when joins are locked
/// - [`RoomError::RoomFull`] when the roster is at `maxPlayers`
/// - [`RoomError::TeamsFull`] when both teams are at `teamSize`
/// - [`RoomError::AlreadyJoined`] when the id is already on the roster
pub fn add_player(
    room: &mut Room,
    id: ParticipantId,
    name: impl Into<String>,
) -> Result<&Player, RoomError> {
    if room.lock_joins {
        return Err(RoomError::Locked);
    }
    if room.player(id).is_some() {
        return Err(RoomError::AlreadyJoined);
    }
    if room.players.len() >= room.settings.max_players {
        return Err(RoomError::RoomFull);
    }
    let team = if room.team_count(Team::A) < room.settings.team_size {
        Team::A
    } else if room.team_count(Team::B) < room.settings.team_size {
        Team::B
    } else {
        return Err(RoomError::TeamsFull);
    };

    room.players.push(Player {
        id,
        name: name.into(),
        score: 0,
        team,
        answered_this_round: false,
        joined_at: now_millis(),
    });
    Ok(&room.players[room.players.len() - 1])
}

/// Milliseconds since the Unix epoch; zero if the clock is before it.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Removes a player. Points they already earned stay in their team's
/// total. Returns the removed player, or `None` if absent.
pub fn remove_player(room: &mut Room, id: ParticipantId) -> Option<Player> {
    let index = room.players.iter().position(|p| p.id == id)?;
    Some(room.players.remove(index))
}

/// Opens `question` as the next round and returns the new round number.
///
/// # Errors
/// - [`RoomError::QuestionOpen`] if a question is already open
/// - [`RoomError::InvalidQuestion`] if the question is malformed
pub fn start_round(room: &mut Room, question: Question) -> Result<u64, RoomError> {
    if room.in_question {
        return Err(RoomError::QuestionOpen);
    }
    question.validate().map_err(RoomError::InvalidQuestion)?;

    room.round += 1;
    room.in_question = true;
    room.question = Some(question);
    for player in &mut room.players {
        player.answered_this_round = false;
    }
    Ok(room.round)
}

/// Scores one answer. The only writer of `score` and `team_scores`.
///
/// Ignored without error when no question is open, the player is
/// unknown, or they already answered this round. Any `choice` other than
/// the correct index (including negative or out-of-range values) is
/// wrong.
pub fn score_answer(room: &mut Room, id: ParticipantId, choice: i64) -> AnswerOutcome {
    if !room.in_question {
        return AnswerOutcome::NoOpenQuestion;
    }
    let Some(correct_index) = room.question.as_ref().map(|q| q.correct_index) else {
        return AnswerOutcome::NoOpenQuestion;
    };
    let settings = room.settings;
    let Some(player) = room.player_mut(id) else {
        return AnswerOutcome::UnknownPlayer;
    };
    if player.answered_this_round {
        return AnswerOutcome::AlreadyAnswered;
    }

    player.answered_this_round = true;
    let correct = usize::try_from(choice).is_ok_and(|c| c == correct_index);
    let delta = if correct {
        settings.points_correct
    } else {
        settings.points_wrong
    };
    player.score = player.score.saturating_add(delta);
    let team = player.team;
    room.team_scores.add(team, delta);
    AnswerOutcome::Scored { correct, delta }
}

/// Closes the open question, keeping it for display. Idempotent; returns
/// whether a question was actually open.
pub fn end_question(room: &mut Room) -> bool {
    std::mem::replace(&mut room.in_question, false)
}

/// The `n` highest scorers; ties keep join order.
pub fn top_players(room: &Room, n: usize) -> Vec<RosterEntry> {
    let mut entries = roster(room);
    // `sort_by` is stable, so equal scores stay in join order.
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(n);
    entries
}

/// Public projection of every player in join order.
pub fn roster(room: &Room) -> Vec<RosterEntry> {
    room.players.iter().map(Player::entry).collect()
}

/// Finds a player by display name, ignoring case.
pub fn find_by_name(room: &Room, name: &str) -> Option<ParticipantId> {
    let wanted = name.to_lowercase();
    room.players
        .iter()
        .find(|p| p.name.to_lowercase() == wanted)
        .map(|p| p.id)
}

/// Admin team rebalancing.
///
/// With both ids on the roster the two players exchange teams (team
/// sizes are unchanged). With only one, that player moves to the other
/// team if it has room. Scores already earned stay with the old team.
///
/// # Errors
/// - [`RoomError::PlayerNotFound`] if neither id is on the roster
/// - [`RoomError::TeamFull`] if the single move would exceed `teamSize`;
///   the roster is left unchanged
pub fn swap_teams(
    room: &mut Room,
    from: Option<ParticipantId>,
    to: Option<ParticipantId>,
) -> Result<(), RoomError> {
    let from_team = from.and_then(|id| room.player(id)).map(|p| p.team);
    let to_team = to.and_then(|id| room.player(id)).map(|p| p.team);

    match (from.zip(from_team), to.zip(to_team)) {
        (Some((a, team_a)), Some((b, team_b))) => {
            set_team(room, a, team_b);
            set_team(room, b, team_a);
            Ok(())
        }
        (Some((id, team)), None) | (None, Some((id, team))) => {
            let target = team.other();
            if room.team_count(target) >= room.settings.team_size {
                return Err(RoomError::TeamFull(target));
            }
            set_team(room, id, target);
            Ok(())
        }
        (None, None) => Err(RoomError::PlayerNotFound),
    }
}

fn set_team(room: &mut Room, id: ParticipantId, team: Team) {
    if let Some(player) = room.player_mut(id) {
        player.team = team;
    }
}

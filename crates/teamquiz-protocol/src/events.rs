//! Inbound and outbound real-time events.
//!
//! Every message on the socket is a JSON object with a `"type"` tag in
//! kebab-case plus camelCase payload fields, for example:
//!
//! ```json
//! {"type": "join", "code": "QZ4K", "name": "ana"}
//! {"type": "round-tick", "secondsLeft": 12}
//! ```
//!
//! Typing both directions as enums means the gateway validates shape at
//! the boundary and the room logic never sees loosely-typed payloads.

use serde::{Deserialize, Serialize};

use crate::types::{
    GameSettings, ParticipantId, Question, RosterEntry, RoomCode, RoundView, Team, TeamScores,
    WinningTeam,
};

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Become the host of a freshly allocated room.
    CreateSession,

    /// Join a room as a player.
    Join { code: String, name: String },

    /// Subscribe to a room as a spectator (no roster entry).
    Watch { code: String },

    /// Host-only: open a host-composed question.
    StartRound(Question),

    /// Answer the open question. Kept signed so that out-of-range input
    /// still parses and is scored as a wrong answer.
    #[serde(rename_all = "camelCase")]
    SubmitAnswer { choice_index: i64 },

    /// Host-only: announce final standings.
    EndGame,

    /// Host-only: block or unblock future joins.
    ToggleLock { locked: bool },
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Messages the server sends to clients.
///
/// None of these ever carries a question's `correctIndex`; questions go
/// out as [`QuestionView`](crate::QuestionView) inside [`RoundView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Reply to `create-session`, sent only to the new host.
    SessionCreated { code: RoomCode, settings: GameSettings },

    /// Reply to a successful `join`, sent only to the joining player.
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        code: RoomCode,
        me: ParticipantId,
        team: Team,
        /// Join time in milliseconds since the Unix epoch.
        joined_at: u64,
        team_scores: TeamScores,
        settings: GameSettings,
    },

    /// Reply to a successful `watch`, with the current snapshot.
    Watching { code: RoomCode, state: RoundView },

    /// Full roster in join order.
    RosterUpdate { roster: Vec<RosterEntry> },

    #[serde(rename_all = "camelCase")]
    TeamScores { team_scores: TeamScores },

    /// A question opened.
    RoundStart(RoundView),

    /// Countdown progress, once per second while a question is open.
    #[serde(rename_all = "camelCase")]
    RoundTick { seconds_left: u32 },

    /// A question closed.
    #[serde(rename_all = "camelCase")]
    RoundEnd {
        round: u64,
        top: Vec<RosterEntry>,
        team_scores: TeamScores,
    },

    RoomLocked { locked: bool },

    /// Final standings after the host ends the game.
    #[serde(rename_all = "camelCase")]
    GameEnded {
        top: Vec<RosterEntry>,
        team_scores: TeamScores,
        winning_team: WinningTeam,
    },

    /// The room is gone (host left). No further events follow for it.
    SessionEnded,

    /// A request from this connection was refused.
    Rejection { reason: String },
}

impl ServerEvent {
    /// Shorthand for building a [`ServerEvent::Rejection`].
    pub fn rejection(reason: impl Into<String>) -> Self {
        Self::Rejection {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_join_parses_from_kebab_tag() {
        let raw = json!({"type": "join", "code": "qz4k", "name": "ana"});
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::Join {
                code: "qz4k".into(),
                name: "ana".into()
            }
        );
    }

    #[test]
    fn test_client_start_round_carries_question_fields_inline() {
        let raw = json!({
            "type": "start-round",
            "id": "q1",
            "text": "2 + 2?",
            "options": ["3", "4"],
            "correctIndex": 1
        });
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        match event {
            ClientEvent::StartRound(q) => {
                assert_eq!(q.id, "q1");
                assert_eq!(q.correct_index, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_client_submit_answer_uses_camel_case() {
        let raw = json!({"type": "submit-answer", "choiceIndex": -1});
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event, ClientEvent::SubmitAnswer { choice_index: -1 });
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        let raw = json!({"type": "launch-missiles"});
        assert!(serde_json::from_value::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn test_round_tick_shape() {
        let json = serde_json::to_value(ServerEvent::RoundTick { seconds_left: 12 }).unwrap();
        assert_eq!(json, json!({"type": "round-tick", "secondsLeft": 12}));
    }

    #[test]
    fn test_round_start_flattens_view_and_hides_answer() {
        let q = Question {
            id: "q1".into(),
            text: "Capital of France?".into(),
            options: vec!["Paris".into(), "Rome".into()],
            correct_index: 0,
            category: None,
        };
        let view = RoundView {
            round: 1,
            question: Some(q.view()),
            seconds_left: 15,
            in_question: true,
            team_scores: TeamScores::default(),
            roster: vec![],
        };
        let json = serde_json::to_value(ServerEvent::RoundStart(view)).unwrap();
        assert_eq!(json["type"], "round-start");
        assert_eq!(json["round"], 1);
        assert_eq!(json["inQuestion"], true);
        assert_eq!(json["teamScores"], json!({"A": 0, "B": 0}));
        assert!(json["question"].get("correctIndex").is_none());
    }

    #[test]
    fn test_game_ended_shape() {
        let event = ServerEvent::GameEnded {
            top: vec![],
            team_scores: TeamScores { a: 5, b: 5 },
            winning_team: WinningTeam::Tie,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["type"], "game-ended");
        assert_eq!(json["winningTeam"], "TIE");
    }

    #[test]
    fn test_session_ended_is_bare_tag() {
        let json = serde_json::to_value(ServerEvent::SessionEnded).unwrap();
        assert_eq!(json, json!({"type": "session-ended"}));
    }
}

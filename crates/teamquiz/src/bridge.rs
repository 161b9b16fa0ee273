//! Chat bridge: turns live-stream chat messages into answers.
//!
//! A viewer whose chat name matches a player's display name can answer by
//! typing a message starting with `A`, `B`, `C` or `D`. The bridge is
//! best-effort: unmapped messages, unknown names and rooms without an open
//! question are dropped with a debug log, and the game never depends on
//! the bridge running.
//!
//! The bridge reads a plain [`ChatMessage`] channel, so any chat source
//! can feed it.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use teamquiz_protocol::{Codec, RoomCode};
use teamquiz_room::{AnswerOutcome, RoomError};
use teamquiz_session::Authenticator;
use tokio::sync::mpsc;

use crate::server::ServerState;

/// One chat message from the external feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Chat display name of the sender.
    pub author: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }
}

/// Where the bridge delivers answers.
///
/// The server state implements this over its registry; tests use a fake.
pub trait ExternalAnswerSink: Send + Sync + 'static {
    /// Codes of every live room.
    fn live_rooms(&self) -> impl Future<Output = Vec<RoomCode>> + Send;

    /// Answers on behalf of the player in `code` named `name`
    /// (case-insensitive).
    fn submit_external_answer(
        &self,
        code: &RoomCode,
        name: &str,
        choice: i64,
    ) -> impl Future<Output = Result<AnswerOutcome, RoomError>> + Send;
}

impl<A: Authenticator, C: Codec> ExternalAnswerSink for ServerState<A, C> {
    async fn live_rooms(&self) -> Vec<RoomCode> {
        self.registry
            .lock()
            .await
            .room_handles()
            .iter()
            .map(|room| room.code().clone())
            .collect()
    }

    async fn submit_external_answer(
        &self,
        code: &RoomCode,
        name: &str,
        choice: i64,
    ) -> Result<AnswerOutcome, RoomError> {
        let room = self.registry.lock().await.require(code)?;
        room.external_answer(name.to_owned(), choice).await
    }
}

/// Maps a chat message to a choice index by its first non-space
/// character: `A`→0 through `D`→3, case-insensitive.
pub fn parse_chat_answer(text: &str) -> Option<i64> {
    match text.trim_start().chars().next()?.to_ascii_uppercase() {
        'A' => Some(0),
        'B' => Some(1),
        'C' => Some(2),
        'D' => Some(3),
        _ => None,
    }
}

/// Runs until the feed closes, offering every mapped message to every
/// live room.
pub async fn run_bridge<S: ExternalAnswerSink>(sink: Arc<S>, mut feed: mpsc::Receiver<ChatMessage>) {
    tracing::info!("chat bridge started");

    while let Some(message) = feed.recv().await {
        let Some(choice) = parse_chat_answer(&message.text) else {
            tracing::trace!(author = %message.author, "chat message is not an answer");
            continue;
        };

        for code in sink.live_rooms().await {
            match sink
                .submit_external_answer(&code, &message.author, choice)
                .await
            {
                Ok(AnswerOutcome::Scored { correct, .. }) => {
                    tracing::debug!(%code, author = %message.author, choice, correct, "chat answer scored");
                }
                Ok(outcome) => {
                    tracing::debug!(%code, author = %message.author, ?outcome, "chat answer ignored");
                }
                Err(RoomError::PlayerNotFound) => {}
                Err(e) => {
                    tracing::debug!(%code, author = %message.author, error = %e, "chat answer dropped");
                }
            }
        }
    }

    tracing::info!("chat feed closed, bridge stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_parse_chat_answer() {
        assert_eq!(parse_chat_answer("a"), Some(0));
        assert_eq!(parse_chat_answer("  b!"), Some(1));
        assert_eq!(parse_chat_answer("C is right"), Some(2));
        assert_eq!(parse_chat_answer("d"), Some(3));
        assert_eq!(parse_chat_answer("e"), None);
        assert_eq!(parse_chat_answer("   "), None);
        assert_eq!(parse_chat_answer(""), None);
        assert_eq!(parse_chat_answer("1"), None);
    }

    /// Records calls; `ana` in `ROOM` is the only known player.
    #[derive(Default)]
    struct FakeSink {
        calls: Mutex<Vec<(RoomCode, String, i64)>>,
    }

    impl ExternalAnswerSink for FakeSink {
        async fn live_rooms(&self) -> Vec<RoomCode> {
            vec![RoomCode::new("ROOM"), RoomCode::new("OTHER")]
        }

        async fn submit_external_answer(
            &self,
            code: &RoomCode,
            name: &str,
            choice: i64,
        ) -> Result<AnswerOutcome, RoomError> {
            self.calls
                .lock()
                .unwrap()
                .push((code.clone(), name.to_owned(), choice));
            if code.as_str() == "ROOM" && name.eq_ignore_ascii_case("ana") {
                Ok(AnswerOutcome::Scored {
                    correct: true,
                    delta: 10,
                })
            } else {
                Err(RoomError::PlayerNotFound)
            }
        }
    }

    #[tokio::test]
    async fn test_bridge_offers_answers_to_every_room() {
        let sink = Arc::new(FakeSink::default());
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(run_bridge(Arc::clone(&sink), rx));

        tx.send(ChatMessage::new("ANA", "b")).await.unwrap();
        tx.send(ChatMessage::new("ana", "hello")).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let calls = sink.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                (RoomCode::new("ROOM"), "ANA".to_owned(), 1),
                (RoomCode::new("OTHER"), "ANA".to_owned(), 1),
            ]
        );
    }
}

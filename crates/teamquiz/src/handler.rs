//! Per-connection gateway: decode client events and route them to rooms.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Open an unbound session for the connection
//!   2. Spawn a writer task draining the connection's outbox
//!   3. Loop: receive events → validate → call the registry or the room
//!   4. On close, the session guard cleans up (host: end the room;
//!      player or spectator: leave it)
//!
//! Refused requests become a `rejection` sent to this connection only.

use std::sync::Arc;

use teamquiz_protocol::{ClientEvent, Codec, ParticipantId, RoomCode, ServerEvent};
use teamquiz_room::{Caller, ParticipantSender, RoomError, RoomHandle};
use teamquiz_session::{Authenticator, Role, SessionError};
use teamquiz_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::TeamquizError;
use crate::server::ServerState;

/// Longest display name accepted on join, in characters.
pub(crate) const MAX_NAME_LEN: usize = 20;

/// Why a client request was refused. The `Display` text is what the
/// client sees.
#[derive(Debug, thiserror::Error)]
enum Refusal {
    #[error("{0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Drop guard that tears down a connection's session when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async work.
struct SessionGuard<A: Authenticator, C: Codec> {
    participant: ParticipantId,
    state: Arc<ServerState<A, C>>,
}

impl<A: Authenticator, C: Codec> Drop for SessionGuard<A, C> {
    fn drop(&mut self) {
        let participant = self.participant;
        let state = Arc::clone(&self.state);
        tokio::spawn(disconnect(state, participant));
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), TeamquizError>
where
    A: Authenticator,
    C: Codec,
{
    let conn = Arc::new(conn);
    let participant = ParticipantId(conn.id().into_inner());
    tracing::debug!(%participant, "handling new connection");

    state.sessions.lock().await.open(participant)?;
    let _guard = SessionGuard {
        participant,
        state: Arc::clone(&state),
    };

    let (outbox, inbox) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), inbox));

    let mut gateway = Gateway {
        participant,
        state: Arc::clone(&state),
        outbox,
        room: None,
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%participant, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%participant, error = %e, "recv error");
                break;
            }
        };

        match state.codec.decode::<ClientEvent>(&data) {
            Ok(event) => gateway.dispatch(event).await,
            Err(e) => {
                tracing::debug!(%participant, error = %e, "failed to decode client event");
                gateway.send(ServerEvent::rejection(format!("invalid message: {e}")));
            }
        }
    }

    writer.abort();
    // _guard drops here → disconnect cleanup fires.
    Ok(())
}

/// Encodes queued events and writes them to the socket, in order.
async fn write_events<A, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<A, C>>,
    mut inbox: mpsc::UnboundedReceiver<ServerEvent>,
) where
    A: Authenticator,
    C: Codec,
{
    while let Some(event) = inbox.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode server event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Releases everything a closed connection held.
async fn disconnect<A, C>(state: Arc<ServerState<A, C>>, participant: ParticipantId)
where
    A: Authenticator,
    C: Codec,
{
    let session = match state.sessions.lock().await.close(participant) {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!(%participant, error = %e, "no session to close");
            return;
        }
    };
    let Some(code) = session.room else {
        return;
    };

    match session.role {
        Role::Host => {
            tracing::info!(%participant, %code, "host disconnected, ending room");
            let removed = state.registry.lock().await.remove_session(&code);
            match removed {
                Ok(room) => {
                    let _ = room.shutdown().await;
                }
                Err(e) => tracing::debug!(%code, error = %e, "room already gone"),
            }
            let released = state.sessions.lock().await.unbind_room(&code);
            tracing::debug!(%code, released = released.len(), "room sessions released");
        }
        Role::Player | Role::Spectator => {
            let room = state.registry.lock().await.get_session(&code);
            if let Some(room) = room {
                let _ = room.leave(participant).await;
            }
        }
        Role::Unbound => {}
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Routing state for one connection.
struct Gateway<A: Authenticator, C: Codec> {
    participant: ParticipantId,
    state: Arc<ServerState<A, C>>,
    outbox: ParticipantSender,
    /// Cached handle to the room this connection is bound to, so room
    /// commands skip the registry lock.
    room: Option<RoomHandle>,
}

impl<A: Authenticator, C: Codec> Gateway<A, C> {
    async fn dispatch(&mut self, event: ClientEvent) {
        let host = Caller::Host(self.participant);
        let result = match event {
            ClientEvent::CreateSession => self.create_session().await,
            ClientEvent::Join { code, name } => self.join(code, name).await,
            ClientEvent::Watch { code } => self.watch(code).await,
            ClientEvent::StartRound(question) => match self.room() {
                Ok(room) => room
                    .start_round(host, question)
                    .await
                    .map(|_| ())
                    .map_err(Refusal::from),
                Err(refusal) => Err(refusal),
            },
            ClientEvent::SubmitAnswer { choice_index } => self.submit_answer(choice_index).await,
            ClientEvent::EndGame => match self.room() {
                Ok(room) => room.end_game(host).await.map_err(Refusal::from),
                Err(refusal) => Err(refusal),
            },
            ClientEvent::ToggleLock { locked } => match self.room() {
                Ok(room) => room.set_lock(host, locked).await.map_err(Refusal::from),
                Err(refusal) => Err(refusal),
            },
        };

        if let Err(refusal) = result {
            tracing::debug!(participant = %self.participant, %refusal, "request refused");
            self.send(ServerEvent::rejection(refusal.to_string()));
        }
    }

    async fn create_session(&mut self) -> Result<(), Refusal> {
        self.ensure_unbound().await?;

        let (code, room, settings) = {
            let mut registry = self.state.registry.lock().await;
            let (code, room) = registry.create_session(self.participant, self.outbox.clone());
            (code, room, registry.config().settings)
        };
        self.state
            .sessions
            .lock()
            .await
            .bind(self.participant, Role::Host, code.clone())?;
        self.room = Some(room);

        self.send(ServerEvent::SessionCreated { code, settings });
        Ok(())
    }

    async fn join(&mut self, code: String, name: String) -> Result<(), Refusal> {
        let code = valid_code(code)?;
        let name = valid_name(&name)?;
        self.ensure_unbound().await?;

        let room = self.state.registry.lock().await.require(&code)?;
        // Bound before the room sees us, so a concurrent room teardown
        // unbinds this session too.
        self.state
            .sessions
            .lock()
            .await
            .bind(self.participant, Role::Player, code.clone())?;
        let team = match room
            .join(self.participant, name.to_owned(), self.outbox.clone())
            .await
        {
            Ok(team) => team,
            Err(e) => {
                self.release(&code).await;
                return Err(e.into());
            }
        };
        self.room = Some(room);

        tracing::debug!(participant = %self.participant, %team, "joined via gateway");
        Ok(())
    }

    async fn watch(&mut self, code: String) -> Result<(), Refusal> {
        let code = valid_code(code)?;
        self.ensure_unbound().await?;

        let room = self.state.registry.lock().await.require(&code)?;
        self.state
            .sessions
            .lock()
            .await
            .bind(self.participant, Role::Spectator, code.clone())?;
        if let Err(e) = room.watch(self.participant, self.outbox.clone()).await {
            self.release(&code).await;
            return Err(e.into());
        }
        self.room = Some(room);
        Ok(())
    }

    async fn submit_answer(&self, choice: i64) -> Result<(), Refusal> {
        let outcome = self.room()?.submit_answer(self.participant, choice).await?;
        match outcome.ignored_reason() {
            Some(reason) => Err(Refusal::Invalid(reason)),
            None => Ok(()),
        }
    }

    /// The room this connection is in, if it is still running.
    fn room(&self) -> Result<RoomHandle, Refusal> {
        self.room
            .as_ref()
            .filter(|room| !room.is_closed())
            .cloned()
            .ok_or(Refusal::Invalid("not in a room"))
    }

    /// Refuses if this connection is in a live room. A binding to a room
    /// that has already left the registry is released instead.
    async fn ensure_unbound(&self) -> Result<(), Refusal> {
        let bound = self
            .state
            .sessions
            .lock()
            .await
            .get(&self.participant)
            .and_then(|session| session.room.clone());
        let Some(code) = bound else {
            return Ok(());
        };

        let live = self
            .state
            .registry
            .lock()
            .await
            .get_session(&code)
            .is_some_and(|room| !room.is_closed());
        if live {
            return Err(SessionError::AlreadyBound.into());
        }

        tracing::debug!(participant = %self.participant, %code, "releasing binding to ended room");
        self.release(&code).await;
        Ok(())
    }

    /// Unbinds this connection if it is still bound to `code`.
    async fn release(&self, code: &RoomCode) {
        self.state
            .sessions
            .lock()
            .await
            .unbind_from(self.participant, code);
    }

    fn send(&self, event: ServerEvent) {
        let _ = self.outbox.send(event);
    }
}

fn valid_code(raw: String) -> Result<RoomCode, Refusal> {
    let code = RoomCode::new(raw);
    if code.as_str().len() < RoomCode::MIN_LEN {
        return Err(Refusal::Invalid("room code must be at least 3 characters"));
    }
    Ok(code)
}

fn valid_name(raw: &str) -> Result<&str, Refusal> {
    let name = raw.trim();
    if !(1..=MAX_NAME_LEN).contains(&name.chars().count()) {
        return Err(Refusal::Invalid("name must be 1-20 characters"));
    }
    Ok(name)
}

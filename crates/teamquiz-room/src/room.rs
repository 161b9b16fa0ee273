//! Room actor: an isolated Tokio task that owns one quiz room.
//!
//! Each room runs in its own task and talks to the outside world through
//! an mpsc channel. Every mutation (join, answer, round start, timer
//! tick, admin edit, disconnect) is applied here one at a time, and the
//! broadcasts describing it are queued before the next command is read.
//! Clients therefore never see a half-applied change, and the answered
//! check in scoring can't race.

use std::collections::HashMap;

use teamquiz_protocol::{ParticipantId, Question, RosterEntry, RoomCode, RoundView, ServerEvent, Team};
use teamquiz_tick::{Countdown, CountdownTick};
use tokio::sync::{mpsc, oneshot};

use crate::config::TOP_PLAYERS;
use crate::engine::{self, AnswerOutcome};
use crate::model::Room;
use crate::{RoomConfig, RoomError};

/// Channel sender for delivering events to one connection.
pub type ParticipantSender = mpsc::UnboundedSender<ServerEvent>;

/// Who is asking for a privileged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// A connection claiming to be the host; checked against the room.
    Host(ParticipantId),
    /// The administrative HTTP surface, already authenticated.
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriberRole {
    Host,
    Player,
    Spectator,
}

struct Subscriber {
    role: SubscriberRole,
    sender: ParticipantSender,
}

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` field are request/response; the caller awaits
/// the `oneshot`.
pub(crate) enum RoomCommand {
    Join {
        participant: ParticipantId,
        name: String,
        sender: ParticipantSender,
        reply: oneshot::Sender<Result<Team, RoomError>>,
    },
    Watch {
        participant: ParticipantId,
        sender: ParticipantSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// A player or spectator disconnected.
    Leave {
        participant: ParticipantId,
    },
    StartRound {
        caller: Caller,
        question: Question,
        reply: oneshot::Sender<Result<u64, RoomError>>,
    },
    SubmitAnswer {
        participant: ParticipantId,
        choice: i64,
        reply: oneshot::Sender<AnswerOutcome>,
    },
    ExternalAnswer {
        name: String,
        choice: i64,
        reply: oneshot::Sender<Result<AnswerOutcome, RoomError>>,
    },
    EndGame {
        caller: Caller,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    SetLock {
        caller: Caller,
        locked: bool,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Kick {
        participant: ParticipantId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Swap {
        from: Option<ParticipantId>,
        to: Option<ParticipantId>,
        reply: oneshot::Sender<Result<Vec<RosterEntry>, RoomError>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoundView>,
    },
    /// End the session: notify everyone and stop the actor.
    Shutdown,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone: it's an `mpsc::Sender` plus the room code. The
/// registry holds one per room and hands out clones, so callers never
/// hold the registry lock while a command is in flight.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Adds a player; returns the team they were placed on.
    pub async fn join(
        &self,
        participant: ParticipantId,
        name: String,
        sender: ParticipantSender,
    ) -> Result<Team, RoomError> {
        self.request(|reply| RoomCommand::Join {
            participant,
            name,
            sender,
            reply,
        })
        .await?
    }

    /// Subscribes a spectator to the room's broadcasts.
    pub async fn watch(
        &self,
        participant: ParticipantId,
        sender: ParticipantSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Watch {
            participant,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a departed player or spectator (fire-and-forget).
    pub async fn leave(&self, participant: ParticipantId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Leave { participant })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Opens a question. A host call is refused while a question is open;
    /// an admin call force-closes the open round first.
    pub async fn start_round(&self, caller: Caller, question: Question) -> Result<u64, RoomError> {
        self.request(|reply| RoomCommand::StartRound {
            caller,
            question,
            reply,
        })
        .await?
    }

    /// Scores an answer from a connected player.
    pub async fn submit_answer(
        &self,
        participant: ParticipantId,
        choice: i64,
    ) -> Result<AnswerOutcome, RoomError> {
        self.request(|reply| RoomCommand::SubmitAnswer {
            participant,
            choice,
            reply,
        })
        .await
    }

    /// Scores an answer on behalf of the player named `name`
    /// (case-insensitive).
    ///
    /// # Errors
    /// [`RoomError::PlayerNotFound`] when no player has that name.
    pub async fn external_answer(&self, name: String, choice: i64) -> Result<AnswerOutcome, RoomError> {
        self.request(|reply| RoomCommand::ExternalAnswer {
            name,
            choice,
            reply,
        })
        .await?
    }

    /// Announces final standings, closing any open round first.
    pub async fn end_game(&self, caller: Caller) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::EndGame { caller, reply })
            .await?
    }

    /// Locks or unlocks joins.
    pub async fn set_lock(&self, caller: Caller, locked: bool) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SetLock {
            caller,
            locked,
            reply,
        })
        .await?
    }

    /// Admin removal of a player.
    pub async fn kick(&self, participant: ParticipantId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Kick { participant, reply })
            .await?
    }

    /// Admin team swap; returns the updated roster.
    pub async fn swap(
        &self,
        from: Option<ParticipantId>,
        to: Option<ParticipantId>,
    ) -> Result<Vec<RosterEntry>, RoomError> {
        self.request(|reply| RoomCommand::Swap { from, to, reply })
            .await?
    }

    /// Scrubbed snapshot of the room.
    pub async fn snapshot(&self) -> Result<RoundView, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Tells the room to end the session and stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    subscribers: HashMap<ParticipantId, Subscriber>,
    countdown: Countdown,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(code = %self.room.code, host = %self.room.host, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(RoomCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                tick = self.countdown.wait_for_tick() => self.on_tick(tick),
            }
        }

        self.countdown.cancel();
        self.broadcast(ServerEvent::SessionEnded);
        tracing::info!(code = %self.room.code, rounds = self.room.round, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                participant,
                name,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_join(participant, name, sender));
            }
            RoomCommand::Watch {
                participant,
                sender,
                reply,
            } => {
                self.handle_watch(participant, sender);
                let _ = reply.send(Ok(()));
            }
            RoomCommand::Leave { participant } => self.handle_leave(participant),
            RoomCommand::StartRound {
                caller,
                question,
                reply,
            } => {
                let _ = reply.send(self.handle_start_round(caller, question));
            }
            RoomCommand::SubmitAnswer {
                participant,
                choice,
                reply,
            } => {
                let _ = reply.send(self.handle_answer(participant, choice));
            }
            RoomCommand::ExternalAnswer { name, choice, reply } => {
                let result = if self.room.in_question {
                    engine::find_by_name(&self.room, &name)
                        .ok_or(RoomError::PlayerNotFound)
                        .map(|id| self.handle_answer(id, choice))
                } else {
                    Ok(AnswerOutcome::NoOpenQuestion)
                };
                let _ = reply.send(result);
            }
            RoomCommand::EndGame { caller, reply } => {
                let _ = reply.send(self.handle_end_game(caller));
            }
            RoomCommand::SetLock {
                caller,
                locked,
                reply,
            } => {
                let _ = reply.send(self.handle_set_lock(caller, locked));
            }
            RoomCommand::Kick { participant, reply } => {
                let _ = reply.send(self.handle_kick(participant));
            }
            RoomCommand::Swap { from, to, reply } => {
                let _ = reply.send(self.handle_swap(from, to));
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            // Handled by the run loop.
            RoomCommand::Shutdown => {}
        }
    }

    fn handle_join(
        &mut self,
        participant: ParticipantId,
        name: String,
        sender: ParticipantSender,
    ) -> Result<Team, RoomError> {
        let player = engine::add_player(&mut self.room, participant, name)?;
        let (team, joined_at) = (player.team, player.joined_at);
        tracing::info!(
            code = %self.room.code,
            %participant,
            %team,
            players = self.room.players.len(),
            "player joined"
        );

        let _ = sender.send(ServerEvent::PlayerJoined {
            code: self.room.code.clone(),
            me: participant,
            team,
            joined_at,
            team_scores: self.room.team_scores,
            settings: self.room.settings,
        });
        self.subscribers.insert(
            participant,
            Subscriber {
                role: SubscriberRole::Player,
                sender,
            },
        );
        self.broadcast_standings();
        Ok(team)
    }

    fn handle_watch(&mut self, participant: ParticipantId, sender: ParticipantSender) {
        let _ = sender.send(ServerEvent::Watching {
            code: self.room.code.clone(),
            state: self.snapshot(),
        });
        self.subscribers.insert(
            participant,
            Subscriber {
                role: SubscriberRole::Spectator,
                sender,
            },
        );
        tracing::debug!(code = %self.room.code, %participant, "spectator subscribed");
    }

    fn handle_leave(&mut self, participant: ParticipantId) {
        let Some(subscriber) = self.subscribers.remove(&participant) else {
            return;
        };
        if subscriber.role == SubscriberRole::Player
            && engine::remove_player(&mut self.room, participant).is_some()
        {
            tracing::info!(
                code = %self.room.code,
                %participant,
                players = self.room.players.len(),
                "player left"
            );
            self.broadcast_standings();
        }
    }

    fn handle_start_round(&mut self, caller: Caller, question: Question) -> Result<u64, RoomError> {
        self.authorize(caller)?;
        // Validate before any forced close so a bad question changes nothing.
        question.validate().map_err(RoomError::InvalidQuestion)?;
        if self.room.in_question {
            match caller {
                Caller::Host(_) => return Err(RoomError::QuestionOpen),
                Caller::Admin => {
                    tracing::info!(
                        code = %self.room.code,
                        round = self.room.round,
                        "admin draw superseding open question"
                    );
                    self.close_round();
                }
            }
        }

        let round = engine::start_round(&mut self.room, question)?;
        self.countdown.open(round, self.room.settings.question_seconds);
        tracing::info!(code = %self.room.code, round, "round opened");
        self.broadcast(ServerEvent::RoundStart(self.snapshot()));
        Ok(round)
    }

    fn handle_answer(&mut self, participant: ParticipantId, choice: i64) -> AnswerOutcome {
        let outcome = engine::score_answer(&mut self.room, participant, choice);
        tracing::debug!(code = %self.room.code, %participant, choice, ?outcome, "answer");
        self.broadcast_standings();
        outcome
    }

    fn handle_end_game(&mut self, caller: Caller) -> Result<(), RoomError> {
        self.authorize(caller)?;
        self.close_round();
        let winning_team = self.room.team_scores.leader();
        tracing::info!(code = %self.room.code, ?winning_team, "game ended");
        self.broadcast(ServerEvent::GameEnded {
            top: engine::top_players(&self.room, TOP_PLAYERS),
            team_scores: self.room.team_scores,
            winning_team,
        });
        Ok(())
    }

    fn handle_set_lock(&mut self, caller: Caller, locked: bool) -> Result<(), RoomError> {
        self.authorize(caller)?;
        self.room.lock_joins = locked;
        tracing::info!(code = %self.room.code, locked, "join lock changed");
        self.broadcast(ServerEvent::RoomLocked { locked });
        Ok(())
    }

    fn handle_kick(&mut self, participant: ParticipantId) -> Result<(), RoomError> {
        engine::remove_player(&mut self.room, participant).ok_or(RoomError::PlayerNotFound)?;
        if let Some(subscriber) = self.subscribers.remove(&participant) {
            let _ = subscriber
                .sender
                .send(ServerEvent::rejection("removed from the room by an admin"));
        }
        tracing::info!(code = %self.room.code, %participant, "player kicked");
        self.broadcast_standings();
        Ok(())
    }

    fn handle_swap(
        &mut self,
        from: Option<ParticipantId>,
        to: Option<ParticipantId>,
    ) -> Result<Vec<RosterEntry>, RoomError> {
        engine::swap_teams(&mut self.room, from, to)?;
        tracing::info!(code = %self.room.code, ?from, ?to, "teams swapped");
        let roster = engine::roster(&self.room);
        self.broadcast(ServerEvent::RosterUpdate {
            roster: roster.clone(),
        });
        Ok(roster)
    }

    fn on_tick(&mut self, tick: CountdownTick) {
        if tick.round != self.room.round || !self.room.in_question {
            tracing::warn!(
                code = %self.room.code,
                tick_round = tick.round,
                room_round = self.room.round,
                countdown = ?self.countdown.state(),
                "stale countdown tick ignored"
            );
            self.countdown.cancel();
            return;
        }

        self.broadcast(ServerEvent::RoundTick {
            seconds_left: tick.remaining,
        });
        if tick.expired {
            self.countdown.finish();
            self.close_round();
        }
    }

    /// Closes the open question, if any: stops its countdown and
    /// broadcasts exactly one `round-end`. No-op when nothing is open.
    fn close_round(&mut self) {
        self.countdown.cancel();
        if !engine::end_question(&mut self.room) {
            return;
        }
        tracing::info!(code = %self.room.code, round = self.room.round, "round closed");
        self.broadcast(ServerEvent::RoundEnd {
            round: self.room.round,
            top: engine::top_players(&self.room, TOP_PLAYERS),
            team_scores: self.room.team_scores,
        });
    }

    fn authorize(&self, caller: Caller) -> Result<(), RoomError> {
        match caller {
            Caller::Admin => Ok(()),
            Caller::Host(id) if id == self.room.host => Ok(()),
            Caller::Host(_) => Err(RoomError::NotHost),
        }
    }

    fn snapshot(&self) -> RoundView {
        RoundView {
            round: self.room.round,
            question: self.room.question.as_ref().map(Question::view),
            seconds_left: self
                .countdown
                .remaining()
                .unwrap_or(self.room.settings.question_seconds),
            in_question: self.room.in_question,
            team_scores: self.room.team_scores,
            roster: engine::roster(&self.room),
        }
    }

    fn broadcast_standings(&self) {
        self.broadcast(ServerEvent::RosterUpdate {
            roster: engine::roster(&self.room),
        });
        self.broadcast(ServerEvent::TeamScores {
            team_scores: self.room.team_scores,
        });
    }

    /// Queues an event for every subscriber of this room. Closed
    /// receivers (connection already gone) are skipped.
    fn broadcast(&self, event: ServerEvent) {
        for subscriber in self.subscribers.values() {
            let _ = subscriber.sender.send(event.clone());
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// The host is subscribed from the start. `config.command_buffer` bounds
/// the command channel, so senders wait when the room falls behind.
pub(crate) fn spawn_room(
    code: RoomCode,
    host: ParticipantId,
    host_sender: ParticipantSender,
    config: &RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer);

    let mut subscribers = HashMap::new();
    subscribers.insert(
        host,
        Subscriber {
            role: SubscriberRole::Host,
            sender: host_sender,
        },
    );

    let actor = RoomActor {
        room: engine::create_room(code.clone(), host, config.settings),
        subscribers,
        countdown: Countdown::with_period(config.tick_period),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}

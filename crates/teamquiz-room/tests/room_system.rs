//! Integration tests for the room system: registry, actor, and countdown
//! working together.
//!
//! Timer tests use `start_paused = true`: Tokio auto-advances the clock
//! whenever every task is idle, so a 15-second countdown runs instantly
//! and deterministically.

use std::time::Duration;

use teamquiz_protocol::{
    GameSettings, ParticipantId, Question, RoomCode, ServerEvent, Team, TeamScores, WinningTeam,
};
use teamquiz_room::{
    AnswerOutcome, Caller, ParticipantSender, QuestionBank, RoomConfig, RoomError, RoomHandle,
    SessionRegistry,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

// =========================================================================
// Helpers
// =========================================================================

const HOST: ParticipantId = ParticipantId(1);

fn pid(id: u64) -> ParticipantId {
    ParticipantId(id)
}

fn channel() -> (ParticipantSender, UnboundedReceiver<ServerEvent>) {
    mpsc::unbounded_channel()
}

fn registry_with(question_seconds: u32) -> SessionRegistry {
    SessionRegistry::new(RoomConfig::with_settings(GameSettings {
        question_seconds,
        ..GameSettings::default()
    }))
}

fn question(id: &str, correct_index: usize) -> Question {
    Question {
        id: id.into(),
        text: format!("Question {id}"),
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        correct_index,
        category: Some("Math".into()),
    }
}

/// Everything already queued for a connection. Only meaningful after
/// awaiting a room reply, which guarantees the broadcasts were queued.
fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Receives until `stop` matches, returning everything seen (inclusive).
async fn recv_until(
    rx: &mut UnboundedReceiver<ServerEvent>,
    stop: impl Fn(&ServerEvent) -> bool,
) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let done = stop(&event);
        events.push(event);
        if done {
            return events;
        }
    }
    panic!("channel closed before expected event; saw {events:?}");
}

struct Fixture {
    registry: SessionRegistry,
    code: RoomCode,
    room: RoomHandle,
    host_rx: UnboundedReceiver<ServerEvent>,
}

fn fixture(question_seconds: u32) -> Fixture {
    let mut registry = registry_with(question_seconds);
    let (host_tx, host_rx) = channel();
    let (code, room) = registry.create_session(HOST, host_tx);
    Fixture {
        registry,
        code,
        room,
        host_rx,
    }
}

async fn join(room: &RoomHandle, id: u64, name: &str) -> UnboundedReceiver<ServerEvent> {
    let (tx, rx) = channel();
    room.join(pid(id), name.into(), tx).await.expect("join should succeed");
    rx
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_acknowledges_and_broadcasts_roster() {
    let mut f = fixture(15);
    let mut ana = join(&f.room, 2, "ana").await;

    let events = drain(&mut ana);
    assert!(matches!(
        &events[0],
        ServerEvent::PlayerJoined { me, team: Team::A, joined_at, .. }
            if *me == pid(2) && *joined_at > 0
    ));
    assert!(matches!(&events[1], ServerEvent::RosterUpdate { roster } if roster.len() == 1));
    assert!(matches!(&events[2], ServerEvent::TeamScores { .. }));

    let host_events = drain(&mut f.host_rx);
    assert!(matches!(&host_events[0], ServerEvent::RosterUpdate { .. }));
    assert!(matches!(&host_events[1], ServerEvent::TeamScores { .. }));
}

#[tokio::test]
async fn test_sixth_player_lands_on_team_b() {
    let f = fixture(15);
    let mut teams = Vec::new();
    for id in 2..=7 {
        let (tx, _rx) = channel();
        teams.push(f.room.join(pid(id), format!("p{id}"), tx).await.unwrap());
    }
    assert_eq!(teams, vec![Team::A, Team::A, Team::A, Team::A, Team::A, Team::B]);
}

#[tokio::test]
async fn test_lock_blocks_joins_and_is_broadcast() {
    let mut f = fixture(15);
    f.room.set_lock(Caller::Host(HOST), true).await.unwrap();
    assert!(drain(&mut f.host_rx).contains(&ServerEvent::RoomLocked { locked: true }));

    let (tx, _rx) = channel();
    assert_eq!(
        f.room.join(pid(2), "late".into(), tx).await.unwrap_err(),
        RoomError::Locked
    );

    f.room.set_lock(Caller::Admin, false).await.unwrap();
    join(&f.room, 2, "late").await;
}

// =========================================================================
// Host authorization
// =========================================================================

#[tokio::test]
async fn test_privileged_calls_require_the_host() {
    let f = fixture(15);
    let _ana = join(&f.room, 2, "ana").await;
    let impostor = Caller::Host(pid(2));

    assert_eq!(
        f.room.start_round(impostor, question("q1", 0)).await.unwrap_err(),
        RoomError::NotHost
    );
    assert_eq!(f.room.end_game(impostor).await.unwrap_err(), RoomError::NotHost);
    assert_eq!(
        f.room.set_lock(impostor, true).await.unwrap_err(),
        RoomError::NotHost
    );
    assert!(!f.room.snapshot().await.unwrap().in_question);
}

// =========================================================================
// Rounds
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_then_closes_round() {
    let f = fixture(3);
    let mut ana = join(&f.room, 2, "ana").await;
    drain(&mut ana);

    assert_eq!(f.room.start_round(Caller::Host(HOST), question("q1", 0)).await, Ok(1));

    let events = recv_until(&mut ana, |e| matches!(e, ServerEvent::RoundEnd { .. })).await;
    let ServerEvent::RoundStart(view) = &events[0] else {
        panic!("expected round-start, got {:?}", events[0]);
    };
    assert_eq!(view.round, 1);
    assert_eq!(view.seconds_left, 3);
    assert!(view.in_question);

    let ticks: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::RoundTick { seconds_left } => Some(*seconds_left),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![2, 1, 0]);
    assert!(matches!(events.last(), Some(ServerEvent::RoundEnd { round: 1, .. })));
    assert!(!f.room.snapshot().await.unwrap().in_question);
}

#[tokio::test(start_paused = true)]
async fn test_host_cannot_start_over_an_open_question() {
    let f = fixture(15);
    f.room.start_round(Caller::Host(HOST), question("q1", 0)).await.unwrap();
    assert_eq!(
        f.room.start_round(Caller::Host(HOST), question("q2", 1)).await,
        Err(RoomError::QuestionOpen)
    );
    assert_eq!(f.room.snapshot().await.unwrap().round, 1);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_reports_live_seconds_left() {
    let f = fixture(10);
    assert_eq!(f.room.snapshot().await.unwrap().seconds_left, 10);

    f.room.start_round(Caller::Host(HOST), question("q1", 0)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let view = f.room.snapshot().await.unwrap();
    assert_eq!(view.seconds_left, 8);
    assert!(view.question.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_answers_score_once_and_broadcast_standings() {
    let f = fixture(15);
    let mut x = join(&f.room, 2, "x").await;
    let _y = join(&f.room, 3, "y").await;
    f.room.start_round(Caller::Host(HOST), question("q1", 1)).await.unwrap();
    drain(&mut x);

    assert_eq!(
        f.room.submit_answer(pid(2), 1).await.unwrap(),
        AnswerOutcome::Scored { correct: true, delta: 10 }
    );
    assert_eq!(
        f.room.submit_answer(pid(3), 0).await.unwrap(),
        AnswerOutcome::Scored { correct: false, delta: -5 }
    );
    assert_eq!(
        f.room.submit_answer(pid(2), 1).await.unwrap(),
        AnswerOutcome::AlreadyAnswered
    );

    let view = f.room.snapshot().await.unwrap();
    let scores: Vec<i64> = view.roster.iter().map(|e| e.score).collect();
    assert_eq!(scores, vec![10, -5]);
    assert_eq!(view.team_scores, TeamScores { a: 5, b: 0 });

    let events = drain(&mut x);
    assert!(events.iter().any(|e| matches!(e, ServerEvent::RosterUpdate { .. })));
    assert!(events.contains(&ServerEvent::TeamScores {
        team_scores: TeamScores { a: 5, b: 0 }
    }));
}

#[tokio::test(start_paused = true)]
async fn test_end_game_closes_open_round_first() {
    let mut f = fixture(15);
    let _x = join(&f.room, 2, "x").await;
    f.room.start_round(Caller::Host(HOST), question("q1", 0)).await.unwrap();
    f.room.submit_answer(pid(2), 0).await.unwrap();
    drain(&mut f.host_rx);

    f.room.end_game(Caller::Host(HOST)).await.unwrap();

    let events = drain(&mut f.host_rx);
    assert!(matches!(&events[0], ServerEvent::RoundEnd { round: 1, .. }));
    let ServerEvent::GameEnded { top, winning_team, .. } = &events[1] else {
        panic!("expected game-ended, got {:?}", events[1]);
    };
    assert_eq!(*winning_team, WinningTeam::A);
    assert_eq!(top[0].id, pid(2));

    // The cancelled countdown never ticks again.
    let late = tokio::time::timeout(Duration::from_secs(30), f.host_rx.recv()).await;
    assert!(late.is_err(), "no events expected after end-game, got {late:?}");
}

// =========================================================================
// Admin forced draw
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_admin_draw_supersedes_open_question_with_one_round_end() {
    let mut f = fixture(15);
    f.room.start_round(Caller::Host(HOST), question("q1", 0)).await.unwrap();
    drain(&mut f.host_rx);

    assert_eq!(f.room.start_round(Caller::Admin, question("q2", 1)).await, Ok(2));

    let events = drain(&mut f.host_rx);
    assert_eq!(events.len(), 2, "unexpected events: {events:?}");
    assert!(matches!(&events[0], ServerEvent::RoundEnd { round: 1, .. }));
    let ServerEvent::RoundStart(view) = &events[1] else {
        panic!("expected round-start, got {:?}", events[1]);
    };
    assert_eq!(view.round, 2);
    assert_eq!(view.seconds_left, 15);

    // Only the new round's countdown runs.
    let next = f.host_rx.recv().await;
    assert_eq!(next, Some(ServerEvent::RoundTick { seconds_left: 14 }));
}

#[tokio::test(start_paused = true)]
async fn test_timer_expiry_racing_forced_draw_yields_single_round_end() {
    let mut f = fixture(2);
    f.room.start_round(Caller::Host(HOST), question("q1", 0)).await.unwrap();

    // Land exactly on the expiry instant, then force the next question.
    tokio::time::sleep(Duration::from_secs(2)).await;
    f.room.start_round(Caller::Admin, question("q2", 0)).await.unwrap();

    let events = recv_until(&mut f.host_rx, |e| {
        matches!(e, ServerEvent::RoundEnd { round: 2, .. })
    })
    .await;

    let round_one_ends = events
        .iter()
        .filter(|e| matches!(e, ServerEvent::RoundEnd { round: 1, .. }))
        .count();
    let starts = events
        .iter()
        .filter(|e| matches!(e, ServerEvent::RoundStart(_)))
        .count();
    assert_eq!(round_one_ends, 1, "events: {events:?}");
    assert_eq!(starts, 2, "events: {events:?}");

    let end_one = events
        .iter()
        .position(|e| matches!(e, ServerEvent::RoundEnd { round: 1, .. }));
    let start_two = events
        .iter()
        .position(|e| matches!(e, ServerEvent::RoundStart(v) if v.round == 2));
    assert!(end_one < start_two);
}

#[tokio::test(start_paused = true)]
async fn test_bank_miss_leaves_room_untouched() {
    let mut f = fixture(15);
    f.registry
        .replace_bank(&f.code, QuestionBank::from_questions([question("q1", 0)]))
        .unwrap();
    f.room.start_round(Caller::Host(HOST), question("live", 0)).await.unwrap();

    assert_eq!(
        f.registry.draw_next(&f.code, Some("Science")).unwrap_err(),
        RoomError::BankEmpty(Some("Science".into()))
    );

    let view = f.room.snapshot().await.unwrap();
    assert!(view.in_question);
    assert_eq!(view.round, 1);
    assert_eq!(f.registry.bank_len(&f.code), 1);
}

// =========================================================================
// Departures
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_host_disconnect_mid_question_ends_session() {
    let mut f = fixture(15);
    let mut ana = join(&f.room, 2, "ana").await;
    f.room.start_round(Caller::Host(HOST), question("q1", 0)).await.unwrap();

    // Let a couple of ticks through first.
    recv_until(&mut ana, |e| matches!(e, ServerEvent::RoundTick { seconds_left: 13 })).await;

    f.registry.destroy_session(&f.code).await.unwrap();

    let rest = recv_until(&mut ana, |e| matches!(e, ServerEvent::SessionEnded)).await;
    assert!(rest.iter().all(|e| !matches!(e, ServerEvent::RoundEnd { .. })));
    // The actor is gone: the channel closes and no tick can follow.
    assert_eq!(ana.recv().await, None);
    assert!(f.registry.get_session(&f.code).is_none());
}

#[tokio::test]
async fn test_player_leave_keeps_team_score() {
    let mut f = fixture(15);
    let _x = join(&f.room, 2, "x").await;
    f.room.start_round(Caller::Host(HOST), question("q1", 0)).await.unwrap();
    f.room.submit_answer(pid(2), 0).await.unwrap();

    f.room.leave(pid(2)).await.unwrap();
    let view = f.room.snapshot().await.unwrap();
    assert!(view.roster.is_empty());
    assert_eq!(view.team_scores.a, 10);

    let events = drain(&mut f.host_rx);
    assert!(events.contains(&ServerEvent::RosterUpdate { roster: vec![] }));
}

#[tokio::test]
async fn test_kick_notifies_and_unsubscribes_player() {
    let f = fixture(15);
    let mut x = join(&f.room, 2, "x").await;
    let mut y = join(&f.room, 3, "y").await;
    drain(&mut x);
    drain(&mut y);

    f.room.kick(pid(2)).await.unwrap();

    assert!(matches!(
        drain(&mut x).as_slice(),
        [ServerEvent::Rejection { .. }]
    ));
    let roster_seen = drain(&mut y);
    assert!(roster_seen.iter().any(
        |e| matches!(e, ServerEvent::RosterUpdate { roster } if roster.len() == 1 && roster[0].id == pid(3))
    ));

    f.room.set_lock(Caller::Admin, true).await.unwrap();
    assert!(drain(&mut x).is_empty());
    assert_eq!(f.room.kick(pid(2)).await, Err(RoomError::PlayerNotFound));
}

// =========================================================================
// Spectators, swaps, external answers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_spectator_sees_broadcasts_without_joining_roster() {
    let f = fixture(15);
    let (tx, mut watcher) = channel();
    f.room.watch(pid(50), tx).await.unwrap();

    let first = drain(&mut watcher);
    assert!(matches!(&first[0], ServerEvent::Watching { state, .. } if state.roster.is_empty()));

    f.room.start_round(Caller::Host(HOST), question("q1", 2)).await.unwrap();
    let events = drain(&mut watcher);
    let ServerEvent::RoundStart(view) = &events[0] else {
        panic!("expected round-start, got {:?}", events[0]);
    };
    assert!(view.roster.is_empty());

    assert_eq!(
        f.room.submit_answer(pid(50), 2).await.unwrap(),
        AnswerOutcome::UnknownPlayer
    );
}

#[tokio::test]
async fn test_swap_into_full_team_is_rejected() {
    let f = fixture(15);
    for id in 2..=7 {
        let (tx, _rx) = channel();
        f.room.join(pid(id), format!("p{id}"), tx).await.unwrap();
    }
    let before = f.room.snapshot().await.unwrap().roster;

    assert_eq!(
        f.room.swap(Some(pid(7)), None).await,
        Err(RoomError::TeamFull(Team::A))
    );
    assert_eq!(f.room.snapshot().await.unwrap().roster, before);

    let roster = f.room.swap(Some(pid(2)), Some(pid(7))).await.unwrap();
    assert_eq!(roster[0].team, Team::B);
    assert_eq!(roster[5].team, Team::A);
}

#[tokio::test(start_paused = true)]
async fn test_external_answer_matches_name_case_insensitively() {
    let f = fixture(15);
    let _p = join(&f.room, 2, "QuizWhiz").await;

    assert_eq!(
        f.room.external_answer("quizwhiz".into(), 0).await,
        Ok(AnswerOutcome::NoOpenQuestion)
    );

    f.room.start_round(Caller::Host(HOST), question("q1", 0)).await.unwrap();
    assert_eq!(
        f.room.external_answer("QUIZWHIZ".into(), 0).await,
        Ok(AnswerOutcome::Scored { correct: true, delta: 10 })
    );
    assert_eq!(
        f.room.external_answer("stranger".into(), 0).await,
        Err(RoomError::PlayerNotFound)
    );
}

//! Round countdown for Teamquiz.
//!
//! A [`Countdown`] is the per-room answer-window timer. It is a small
//! state machine:
//!
//! ```text
//! Idle ──open(round, secs)──▶ Open ──remaining hits 0──▶ Closed ──finish()──▶ Idle
//!                               │
//!                               └──cancel()──▶ Idle
//! ```
//!
//! Each open window is bound to the round number that opened it. That
//! number is the cancellation token: [`Countdown::cancel`] drops the
//! deadline outright, and every [`CountdownTick`] carries its round so
//! the owner can discard a tick that no longer matches the room.
//!
//! # Integration
//!
//! The countdown sits inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         tick = countdown.wait_for_tick() => {
//!             broadcast(RoundTick { seconds_left: tick.remaining });
//!             if tick.expired { countdown.finish(); close_round(); }
//!         }
//!     }
//! }
//! ```
//!
//! While no window is open, [`Countdown::wait_for_tick`] pends forever,
//! so `select!` simply keeps serving commands.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Default spacing between countdown ticks.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where the countdown is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// No answer window. `wait_for_tick` pends.
    Idle,
    /// Counting down for `round`.
    Open { round: u64, remaining: u32 },
    /// Reached zero for `round`; waiting for the owner to broadcast the
    /// round end and call [`Countdown::finish`].
    Closed { round: u64 },
}

/// One countdown step, returned by [`Countdown::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    /// The round this window belongs to.
    pub round: u64,
    /// Seconds left after this tick.
    pub remaining: u32,
    /// `true` on the tick that brought `remaining` to zero.
    pub expired: bool,
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Cancel-aware per-room answer timer. One per room actor.
#[derive(Debug)]
pub struct Countdown {
    period: Duration,
    state: CountdownState,
    /// When the next tick should fire (Tokio instant for `sleep_until`).
    next_tick: Option<Instant>,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    /// An idle countdown ticking once per second when opened.
    pub fn new() -> Self {
        Self::with_period(DEFAULT_PERIOD)
    }

    /// An idle countdown with a custom tick spacing.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            state: CountdownState::Idle,
            next_tick: None,
        }
    }

    /// Opens an answer window of `seconds` for `round`.
    ///
    /// Returns `false` and changes nothing if a window is already open:
    /// a running countdown must be [`cancel`](Self::cancel)led first.
    pub fn open(&mut self, round: u64, seconds: u32) -> bool {
        if let CountdownState::Open { round: current, .. } = self.state {
            warn!(current, requested = round, "countdown already open");
            return false;
        }
        self.state = CountdownState::Open {
            round,
            remaining: seconds,
        };
        self.next_tick = Some(Instant::now() + self.period);
        debug!(round, seconds, "countdown opened");
        true
    }

    /// Stops the current window, if any, and returns to `Idle`.
    ///
    /// Returns the round whose window was cancelled. After this call no
    /// tick for that round will ever be produced.
    pub fn cancel(&mut self) -> Option<u64> {
        let cancelled = match self.state {
            CountdownState::Open { round, .. } | CountdownState::Closed { round } => Some(round),
            CountdownState::Idle => None,
        };
        self.state = CountdownState::Idle;
        self.next_tick = None;
        if let Some(round) = cancelled {
            debug!(round, "countdown cancelled");
        }
        cancelled
    }

    /// Acknowledges a `Closed` window and returns to `Idle`.
    pub fn finish(&mut self) {
        if let CountdownState::Closed { round } = self.state {
            trace!(round, "countdown finished");
            self.state = CountdownState::Idle;
        }
    }

    /// Waits until the next tick is due.
    ///
    /// Pends forever unless a window is `Open`. Cancel-safe: dropping the
    /// future (e.g. when another `select!` branch wins) loses nothing,
    /// because state only changes after the sleep completes.
    pub async fn wait_for_tick(&mut self) -> CountdownTick {
        let (round, remaining, next) = match (self.state, self.next_tick) {
            (CountdownState::Open { round, remaining }, Some(next)) => (round, remaining, next),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        // Resume from now rather than bursting missed ticks.
        self.next_tick = Some(if late_by > self.period / 10 {
            warn!(
                round,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "countdown tick fired late"
            );
            now + self.period
        } else {
            next + self.period
        });

        let remaining = remaining.saturating_sub(1);
        let expired = remaining == 0;
        if expired {
            self.state = CountdownState::Closed { round };
            self.next_tick = None;
            debug!(round, "countdown expired");
        } else {
            self.state = CountdownState::Open { round, remaining };
        }
        trace!(round, remaining, "countdown tick");

        CountdownTick {
            round,
            remaining,
            expired,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Seconds left in the open window, or `None` when not counting.
    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            CountdownState::Open { remaining, .. } => Some(remaining),
            _ => None,
        }
    }
}

//! Wire protocol for Teamquiz.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`Question`], [`RoundView`], [`TeamScores`], ...) used by
//!   every layer and shaped for the wire.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) as tagged enums, one
//!   variant per message kind.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) converting messages to and
//!   from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the room
//! logic. It knows nothing about connections or rooms.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Room actor → Protocol (ServerEvent) → Transport
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod events;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, ServerEvent};
pub use types::{
    GameSettings, ParticipantId, Question, QuestionView, RosterEntry, RoomCode, RoundView, Team,
    TeamScores, WinningTeam,
};

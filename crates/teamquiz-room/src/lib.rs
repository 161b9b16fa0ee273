//! Rooms for Teamquiz.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! roster, scores, current question, and round countdown.
//!
//! # Key types
//!
//! - [`engine`]: pure game rules over a [`Room`]
//! - [`SessionRegistry`]: creates/destroys rooms by code, owns question banks
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`QuestionBank`]: per-room queue of uploaded questions
//! - [`RoomConfig`]: settings every new room is spawned with

pub mod engine;

mod bank;
mod config;
mod error;
mod model;
mod registry;
mod room;

pub use bank::{BankError, BankSummary, DEFAULT_CATEGORY, QuestionBank};
pub use config::{RoomConfig, TOP_PLAYERS};
pub use engine::AnswerOutcome;
pub use error::RoomError;
pub use model::{Player, Room};
pub use registry::SessionRegistry;
pub use room::{Caller, ParticipantSender, RoomHandle};
pub use teamquiz_protocol::GameSettings;

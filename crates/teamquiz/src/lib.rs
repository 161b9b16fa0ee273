//! # Teamquiz
//!
//! Live two-team quiz server.
//!
//! A host opens a room over WebSocket and gets a short code; players join
//! with that code and are balanced onto team A or B; the host (or an admin
//! drawing from an uploaded question bank) opens timed questions and every
//! connection in the room sees the countdown, scores, and standings live.
//!
//! The server has three inputs:
//!
//! - the **real-time gateway** (WebSocket, JSON events, see
//!   [`ClientEvent`](teamquiz_protocol::ClientEvent)),
//! - the **admin HTTP surface** (shared-secret protected, rate limited
//!   per client IP),
//! - an optional **chat bridge** that turns chat messages into answers
//!   ([`bridge`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use teamquiz::prelude::*;
//!
//! # async fn start() -> Result<(), TeamquizError> {
//! let config = ServerConfig::load();
//! let server = TeamquizServerBuilder::from_config(&config)?
//!     .build(SharedSecret::new(config.admin_token.clone()))
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod logger;

mod admin;
mod error;
mod handler;
mod limit;
mod server;

pub use admin::AdminError;
pub use error::TeamquizError;
pub use limit::RateLimit;
pub use server::{TeamquizServer, TeamquizServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::bridge::{ChatMessage, ExternalAnswerSink};
    pub use crate::config::ServerConfig;
    pub use crate::{RateLimit, TeamquizError, TeamquizServer, TeamquizServerBuilder};
    pub use teamquiz_room::{GameSettings, RoomConfig};
    pub use teamquiz_session::{Authenticator, SharedSecret};
}

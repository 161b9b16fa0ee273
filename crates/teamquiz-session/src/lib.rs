//! Connection sessions for Teamquiz.
//!
//! This crate answers two questions the gateway keeps asking:
//!
//! 1. **Who is on this connection?** A [`Session`] records which room a
//!    connection is bound to and in which [`Role`] (host, player,
//!    spectator). [`SessionManager`] owns all of them.
//! 2. **May this caller use the admin surface?** The [`Authenticator`]
//!    trait, with [`SharedSecret`] as the shipped implementation.
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway / Admin (above)  ← looks up sessions, checks admin tokens
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below)  ← provides ParticipantId, RoomCode
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod session;

pub use auth::{ADMIN_TOKEN_HEADER, Authenticator, SharedSecret};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Role, Session};

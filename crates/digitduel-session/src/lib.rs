//! Session engine for digitduel.
//!
//! Each session runs as an isolated Tokio task (actor model) that owns one
//! [`GameSession`] and the outbound channels of its members. Every request
//! for a session is a command on that actor's queue, so two requests for
//! the same session never interleave.
//!
//! # Key types
//!
//! - [`rules`] — the 4-unique-digit validator and guess scoring
//! - [`GameSession`] — the pure state machine for one game
//! - [`SessionManager`] — creates sessions, tracks membership, tears down
//!   sessions on disconnect
//! - [`SessionHandle`] — send commands to a running session actor
//! - [`SessionConfig`] / [`SessionPhase`] — settings and lifecycle

mod actor;
mod config;
mod error;
mod game;
mod manager;
pub mod rules;

pub use actor::{PlayerSender, SessionHandle};
pub use config::{SessionConfig, SessionPhase};
pub use error::GameError;
pub use game::{GameSession, Outbox, Seat};
pub use manager::SessionManager;
pub use rules::{Digits, Score};

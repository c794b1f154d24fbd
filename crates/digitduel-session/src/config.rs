//! Session configuration and lifecycle phases.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Settings for the session engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of characters in a generated session code.
    pub code_length: usize,

    /// Capacity of each session actor's command queue. Senders wait when
    /// it is full.
    pub channel_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where a session is in its life.
///
/// Phases only move forward:
///
/// ```text
/// WaitingForOpponent → ChoosingNumbers → InProgress → Finished
/// ```
///
/// - **WaitingForOpponent**: only the host is seated; joinable.
/// - **ChoosingNumbers**: both seats taken, at least one secret missing.
/// - **InProgress**: both secrets locked, guesses accepted in turn.
/// - **Finished**: someone guessed exactly; the session stays readable
///   until a player disconnects.
///
/// There is no phase for "destroyed": a destroyed session simply no
/// longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    WaitingForOpponent,
    ChoosingNumbers,
    InProgress,
    Finished,
}

impl SessionPhase {
    /// Returns `true` if a second player may still join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::WaitingForOpponent)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingForOpponent => write!(f, "WaitingForOpponent"),
            Self::ChoosingNumbers => write!(f, "ChoosingNumbers"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

//! Error types for the session engine.

use digitduel_protocol::{PlayerId, SessionCode};

/// Reasons a request against a session is rejected.
///
/// Every variant is local to the request: it is reported to the requester
/// only and never changes session state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No live session has this code.
    #[error("session {0} not found")]
    SessionNotFound(SessionCode),

    /// The session already has two players.
    #[error("session {0} is full")]
    SessionFull(SessionCode),

    /// A secret or guess is not exactly four distinct digits.
    #[error("invalid number {0:?}: must be 4 unique digits")]
    InvalidNumber(String),

    /// The requester does not hold the turn.
    #[error("not your turn")]
    NotYourTurn,

    /// Guesses are refused until both secrets are locked.
    #[error("game has not started yet")]
    GameNotStarted,

    /// The session already has a winner.
    #[error("game is already over")]
    GameAlreadyOver,

    /// The requester is already seated in this session.
    #[error("player {0} already in session {1}")]
    AlreadyJoined(PlayerId, SessionCode),

    /// The requester is not seated in this session.
    #[error("player {0} not in session {1}")]
    NotAMember(PlayerId, SessionCode),

    /// Secrets cannot change once the game has started.
    #[error("number is locked once the game has started")]
    NumberLocked,

    /// Every attempt at a fresh session code collided with a live one.
    #[error("no free session code")]
    NoFreeCode,
}

impl GameError {
    /// HTTP-style status code sent alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            Self::SessionNotFound(_) => 404,
            Self::NotYourTurn | Self::NotAMember(..) => 403,
            Self::InvalidNumber(_) => 422,
            Self::SessionFull(_)
            | Self::GameNotStarted
            | Self::GameAlreadyOver
            | Self::AlreadyJoined(..)
            | Self::NumberLocked => 409,
            Self::NoFreeCode => 503,
        }
    }
}

//! # digitduel
//!
//! A server for a two-player number-guessing duel. Each player locks a
//! secret of four distinct digits; players take turns guessing the
//! opponent's secret and are told how many digits are right and how many
//! are in the right place, until someone hits it exactly.
//!
//! Clients speak JSON over WebSockets. One connection is one player; a
//! session is addressed by a short code the host shares out of band.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use digitduel::prelude::*;
//!
//! # async fn start() -> Result<(), DuelError> {
//! let server = DuelServerBuilder::new()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::DuelError;
pub use server::{DuelServer, DuelServerBuilder};

/// Convenient re-exports for building and talking to a server.
pub mod prelude {
    pub use crate::{DuelError, DuelServer, DuelServerBuilder};
    pub use digitduel_protocol::{
        ClientMessage, Codec, Envelope, GameStateView, GuessRecord,
        JsonCodec, NumberInput, PlayerId, PlayerReady, RevealedNumbers,
        ServerMessage, SessionCode,
    };
    pub use digitduel_session::{GameError, SessionConfig};
}

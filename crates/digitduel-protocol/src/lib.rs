//! Wire protocol for digitduel.
//!
//! This crate defines the "language" that clients and the game server
//! speak:
//!
//! - **Types** ([`Envelope`], [`ClientMessage`], [`ServerMessage`], etc.) —
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the session
//! engine (game rules). It doesn't know about connections or sessions —
//! it only knows how to serialize and deserialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session engine (GameSession)
//! ```
//!
//! # Wire shape
//!
//! Every message is an [`Envelope`] whose `payload` is tagged by `type`
//! with the camelCase event name:
//!
//! ```json
//! { "seq": 3, "timestamp": 1200,
//!   "payload": { "type": "makeGuess", "sessionCode": "K3X9QZ", "guess": "5679" } }
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Envelope, GameStateView, GuessRecord, NumberInput,
    PlayerId, PlayerReady, Recipient, RevealedNumbers, ServerMessage,
    SessionCode,
};

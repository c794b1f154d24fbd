//! Unified error type for the digitduel server.

use digitduel_protocol::ProtocolError;
use digitduel_transport::TransportError;

/// Errors that end a connection or stop the server.
///
/// Rejected game requests are not errors at this level: they are answered
/// to the client as `error` events and the connection carries on.
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

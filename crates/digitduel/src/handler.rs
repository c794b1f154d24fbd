//! Per-connection handler: decoding, request dispatch, and event delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The connection *is* the player: its [`ConnectionId`] becomes the
//! [`PlayerId`] for as long as the socket stays open.
//!
//! The loop selects over two sources:
//!   1. inbound frames from the socket, decoded and dispatched to the
//!      session engine
//!   2. outbound events on the player's channel, fed by session actors
//!      and by the handler's own replies
//!
//! Every outbound event goes through that one channel, so the player sees
//! events in the order they were produced.
//!
//! [`ConnectionId`]: digitduel_transport::ConnectionId

use std::sync::Arc;
use std::time::Instant;

use digitduel_protocol::{
    ClientMessage, Codec, Envelope, PlayerId, ServerMessage,
};
use digitduel_session::{GameError, PlayerSender};
use digitduel_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::DuelError;

/// Drop guard that tears down a player's sessions when the handler exits.
///
/// This runs even if the handler panics. Since `Drop` is synchronous, we
/// spawn a fire-and-forget task for the async cleanup.
struct DisconnectGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let removed = state.sessions.lock().await.disconnect(player_id).await;
            if !removed.is_empty() {
                tracing::info!(
                    %player_id,
                    sessions = removed.len(),
                    "sessions closed on disconnect"
                );
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), DuelError> {
    let conn_id = conn.id();
    let player_id = PlayerId::from(conn_id);
    tracing::info!(%conn_id, %player_id, "connection accepted");

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let _guard = DisconnectGuard {
        player_id,
        state: Arc::clone(&state),
    };

    let start = Instant::now();
    let mut seq: u64 = 1;
    let mut last_inbound = tokio::time::Instant::now();

    loop {
        let deadline = state.idle_timeout.map(|limit| last_inbound + limit);
        let inbound = async {
            match deadline {
                Some(deadline) => {
                    tokio::time::timeout_at(deadline, conn.recv()).await.ok()
                }
                None => Some(conn.recv().await),
            }
        };

        tokio::select! {
            received = inbound => {
                let data = match received {
                    Some(Ok(Some(data))) => data,
                    Some(Ok(None)) => {
                        tracing::info!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                    None => {
                        tracing::info!(%player_id, "connection idle, closing");
                        let _ = conn.close().await;
                        break;
                    }
                };
                last_inbound = tokio::time::Instant::now();
                handle_frame(&state, player_id, &tx, &data, &start).await;
            }
            Some(event) = rx.recv() => {
                let envelope = Envelope {
                    seq: next_seq(&mut seq),
                    timestamp: millis_since(&start),
                    payload: event,
                };
                let bytes = state.codec.encode(&envelope)?;
                conn.send(&bytes).await?;
            }
        }
    }

    // _guard drops here → session teardown fires.
    Ok(())
}

/// Decodes one inbound frame and runs the request it carries.
///
/// Undecodable frames and rejected requests are answered with an `error`
/// event; neither closes the connection.
async fn handle_frame<C: Codec>(
    state: &ServerState<C>,
    player_id: PlayerId,
    tx: &PlayerSender,
    data: &[u8],
    start: &Instant,
) {
    let envelope: Envelope<ClientMessage> = match state.codec.decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "failed to decode envelope");
            let _ = tx.send(ServerMessage::Error {
                code: 400,
                message: format!("malformed message: {e}"),
            });
            return;
        }
    };

    if let Err(e) = handle_request(state, player_id, tx, envelope.payload, start).await {
        let _ = tx.send(ServerMessage::Error {
            code: e.code(),
            message: e.to_string(),
        });
    }
}

/// Runs one client request against the session engine.
///
/// Events for the requester and the other members are delivered by the
/// session actor; only answers that no actor produces are queued here.
async fn handle_request<C: Codec>(
    state: &ServerState<C>,
    player_id: PlayerId,
    tx: &PlayerSender,
    request: ClientMessage,
    start: &Instant,
) -> Result<(), GameError> {
    match request {
        ClientMessage::CreateSession => {
            state
                .sessions
                .lock()
                .await
                .create_session(player_id, tx.clone())?;
        }

        ClientMessage::JoinSession { session_code } => {
            state
                .sessions
                .lock()
                .await
                .join_session(player_id, &session_code, tx.clone())
                .await?;
        }

        // The manager lock is only held to look up the handle; the
        // request itself waits on the session actor.
        ClientMessage::SetNumber {
            session_code,
            number,
        } => {
            let handle = state.sessions.lock().await.handle(&session_code)?;
            handle.set_number(player_id, number.into_text()).await?;
        }

        ClientMessage::MakeGuess {
            session_code,
            guess,
        } => {
            let handle = state.sessions.lock().await.handle(&session_code)?;
            handle.make_guess(player_id, guess.into_text()).await?;
        }

        ClientMessage::GetGameState { session_code } => {
            let handle = state.sessions.lock().await.handle(&session_code)?;
            let view = handle.game_state().await?;
            let _ = tx.send(ServerMessage::GameState(view));
        }

        ClientMessage::LeaveSession { session_code } => {
            state
                .sessions
                .lock()
                .await
                .leave_session(player_id, &session_code)
                .await?;
        }

        ClientMessage::Heartbeat { client_time } => {
            let _ = tx.send(ServerMessage::HeartbeatAck {
                client_time,
                server_time: millis_since(start),
            });
        }
    }

    Ok(())
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

fn millis_since(start: &Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seq_counts_up() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }

    #[test]
    fn test_millis_since_now_is_small() {
        assert!(millis_since(&Instant::now()) < 1_000);
    }
}

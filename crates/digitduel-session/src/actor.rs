//! Session actor: an isolated Tokio task that owns one game.
//!
//! Each session runs in its own task and is reached only through an mpsc
//! channel. Commands are handled one at a time, so the read-modify-write
//! of turn, readiness and winner never interleaves between requests.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use digitduel_protocol::{
    GameStateView, PlayerId, Recipient, ServerMessage, SessionCode,
};
use tokio::sync::{mpsc, oneshot};

use crate::{GameError, GameSession, Outbox};

/// Channel sender for delivering events to a player's connection handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to a session actor through its channel.
///
/// Every variant except `Shutdown` carries a reply channel: the caller
/// sends the command and waits for the outcome on it.
pub(crate) enum SessionCommand {
    Join {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: Reply<Result<(), GameError>>,
    },

    SetNumber {
        player_id: PlayerId,
        number: String,
        reply: Reply<Result<(), GameError>>,
    },

    MakeGuess {
        player_id: PlayerId,
        guess: String,
        reply: Reply<Result<(), GameError>>,
    },

    GetState {
        reply: Reply<GameStateView>,
    },

    /// Remove a player. On success the actor stops: a session never
    /// continues with one player.
    Leave {
        player_id: PlayerId,
        reply: Reply<Result<(), GameError>>,
    },

    Shutdown,
}

/// Handle to a running session actor.
///
/// Cheap to clone; the [`SessionManager`](crate::SessionManager) holds one
/// per live session. Once the actor has stopped every call fails with
/// [`GameError::SessionNotFound`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    code: SessionCode,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Seats `player_id` as the guest. Events for the player will be
    /// delivered on `sender`.
    pub async fn join(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<(), GameError> {
        self.request(|reply| SessionCommand::Join {
            player_id,
            sender,
            reply,
        })
        .await?
    }

    /// Locks the player's secret number.
    pub async fn set_number(
        &self,
        player_id: PlayerId,
        number: impl Into<String>,
    ) -> Result<(), GameError> {
        let number = number.into();
        self.request(|reply| SessionCommand::SetNumber {
            player_id,
            number,
            reply,
        })
        .await?
    }

    /// Submits a guess. The result is broadcast to every member.
    pub async fn make_guess(
        &self,
        player_id: PlayerId,
        guess: impl Into<String>,
    ) -> Result<(), GameError> {
        let guess = guess.into();
        self.request(|reply| SessionCommand::MakeGuess {
            player_id,
            guess,
            reply,
        })
        .await?
    }

    /// Returns a snapshot of the game.
    pub async fn game_state(&self) -> Result<GameStateView, GameError> {
        self.request(|reply| SessionCommand::GetState { reply }).await
    }

    /// Removes a player, notifying the rest, and stops the session.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), GameError> {
        self.request(|reply| SessionCommand::Leave { player_id, reply })
            .await?
    }

    /// Stops the session without notifying anyone.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| self.gone())
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.gone())?;
        reply_rx.await.map_err(|_| self.gone())
    }

    fn gone(&self) -> GameError {
        GameError::SessionNotFound(self.code.clone())
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor {
    game: GameSession,
    /// Per-member outbound channels.
    senders: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    /// Runs the actor loop until shutdown, a successful leave, or every
    /// handle is dropped.
    async fn run(mut self) {
        let code = self.game.code().clone();
        tracing::debug!(%code, "session actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                SessionCommand::Join {
                    player_id,
                    sender,
                    reply,
                } => {
                    let result = match self.game.join(player_id) {
                        Ok(outbox) => {
                            self.senders.insert(player_id, sender);
                            self.dispatch(outbox);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    };
                    self.reject_logged(player_id, &result);
                    let _ = reply.send(result);
                }
                SessionCommand::SetNumber {
                    player_id,
                    number,
                    reply,
                } => {
                    let result = self
                        .game
                        .set_number(player_id, &number)
                        .map(|outbox| self.dispatch(outbox));
                    self.reject_logged(player_id, &result);
                    let _ = reply.send(result);
                }
                SessionCommand::MakeGuess {
                    player_id,
                    guess,
                    reply,
                } => {
                    let result = self
                        .game
                        .make_guess(player_id, &guess, now_millis())
                        .map(|outbox| self.dispatch(outbox));
                    self.reject_logged(player_id, &result);
                    let _ = reply.send(result);
                }
                SessionCommand::GetState { reply } => {
                    let _ = reply.send(self.game.snapshot());
                }
                SessionCommand::Leave { player_id, reply } => {
                    match self.game.leave(player_id) {
                        Ok(outbox) => {
                            self.senders.remove(&player_id);
                            self.dispatch(outbox);
                            let _ = reply.send(Ok(()));
                            break;
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e));
                        }
                    }
                }
                SessionCommand::Shutdown => {
                    tracing::debug!(%code, "session shutting down");
                    break;
                }
            }
        }

        tracing::debug!(%code, phase = %self.game.phase(), "session actor stopped");
    }

    fn reject_logged(&self, player_id: PlayerId, result: &Result<(), GameError>) {
        if let Err(reason) = result {
            tracing::debug!(
                code = %self.game.code(),
                %player_id,
                %reason,
                "request rejected"
            );
        }
    }

    /// Dispatches outbound events to the correct members.
    fn dispatch(&self, outbox: Outbox) {
        for (recipient, msg) in outbox {
            match recipient {
                Recipient::All => {
                    for pid in self.senders.keys() {
                        self.send_to(*pid, msg.clone());
                    }
                }
                Recipient::Player(pid) => {
                    self.send_to(pid, msg);
                }
                Recipient::AllExcept(excluded) => {
                    for pid in self.senders.keys() {
                        if *pid != excluded {
                            self.send_to(*pid, msg.clone());
                        }
                    }
                }
            }
        }
    }

    /// Sends an event to a single member. Silently drops it if the
    /// receiver is gone (connection already closed).
    fn send_to(&self, player_id: PlayerId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }
}

/// Opens a session for `host` and spawns its actor task.
///
/// The host's `sessionCreated` event is queued on `host_sender` before this
/// returns. `channel_size` bounds the command queue; senders wait when it
/// is full.
pub(crate) fn spawn_session(
    code: SessionCode,
    host: PlayerId,
    host_sender: PlayerSender,
    channel_size: usize,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let (game, outbox) = GameSession::open(code.clone(), host);
    let actor = SessionActor {
        game,
        senders: HashMap::from([(host, host_sender)]),
        receiver: rx,
    };
    actor.dispatch(outbox);

    tokio::spawn(actor.run());

    SessionHandle { code, sender: tx }
}

/// Milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(host: PlayerId) -> (SessionHandle, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_session(SessionCode::new("TEST01"), host, tx, 8);
        (handle, rx)
    }

    #[tokio::test]
    async fn test_spawn_session_queues_session_created() {
        let (handle, mut rx) = open(PlayerId(1));
        assert_eq!(handle.code().as_str(), "TEST01");
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::SessionCreated {
                session_code: SessionCode::new("TEST01"),
                player_id: PlayerId(1),
            })
        );
    }

    #[tokio::test]
    async fn test_leave_stops_actor() {
        let (handle, _rx) = open(PlayerId(1));
        handle.leave(PlayerId(1)).await.unwrap();

        let result = handle.game_state().await;
        assert_eq!(
            result,
            Err(GameError::SessionNotFound(SessionCode::new("TEST01")))
        );
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_failed_leave_keeps_actor_running() {
        let (handle, _rx) = open(PlayerId(1));
        assert!(handle.leave(PlayerId(5)).await.is_err());
        assert_eq!(handle.game_state().await.unwrap().player_count, 1);
    }

    #[tokio::test]
    async fn test_shutdown_then_requests_fail() {
        let (handle, _rx) = open(PlayerId(1));
        handle.shutdown().await.unwrap();
        assert!(matches!(
            handle.set_number(PlayerId(1), "1234").await,
            Err(GameError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}

//! Session manager: creates sessions, tracks membership, and tears
//! sessions down when a player goes away.

use std::collections::{HashMap, HashSet};

use digitduel_protocol::{PlayerId, SessionCode};
use rand::Rng;

use crate::actor::spawn_session;
use crate::{GameError, PlayerSender, SessionConfig, SessionHandle};

/// Characters a session code is drawn from. Upper-case only, since codes
/// are compared after upper-casing.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fresh codes drawn before `create_session` gives up.
const MAX_CODE_ATTEMPTS: usize = 64;

/// Owns every live session, keyed by code.
///
/// This is the only way in to a session: the server holds one manager
/// behind a lock and nothing else keeps session handles around.
#[derive(Debug)]
pub struct SessionManager {
    /// Live sessions, keyed by code.
    sessions: HashMap<SessionCode, SessionHandle>,

    /// The sessions each player is seated in. Used to find what to tear
    /// down when a connection closes.
    memberships: HashMap<PlayerId, HashSet<SessionCode>>,

    config: SessionConfig,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            memberships: HashMap::new(),
            config,
        }
    }

    /// Opens a new session hosted by `host` and returns its code.
    ///
    /// The code is regenerated while it collides with a live session.
    /// `sessionCreated` is queued on `sender` before this returns.
    ///
    /// # Errors
    /// [`GameError::NoFreeCode`] if `MAX_CODE_ATTEMPTS` draws all
    /// collide, which only happens when the code space is nearly full.
    pub fn create_session(
        &mut self,
        host: PlayerId,
        sender: PlayerSender,
    ) -> Result<SessionCode, GameError> {
        let code = (0..MAX_CODE_ATTEMPTS)
            .map(|_| generate_code(self.config.code_length))
            .find(|candidate| {
                let taken = self.sessions.contains_key(candidate);
                if taken {
                    tracing::debug!(code = %candidate, "session code collision, retrying");
                }
                !taken
            })
            .ok_or_else(|| {
                tracing::warn!(
                    sessions = self.sessions.len(),
                    code_length = self.config.code_length,
                    "no free session code"
                );
                GameError::NoFreeCode
            })?;

        let handle = spawn_session(
            code.clone(),
            host,
            sender,
            self.config.channel_size,
        );
        self.sessions.insert(code.clone(), handle);
        self.memberships
            .entry(host)
            .or_default()
            .insert(code.clone());

        tracing::info!(%code, %host, "session created");
        Ok(code)
    }

    /// Seats `player` in the session `code`.
    pub async fn join_session(
        &mut self,
        player: PlayerId,
        code: &SessionCode,
        sender: PlayerSender,
    ) -> Result<(), GameError> {
        let handle = self.handle(code)?;
        handle.join(player, sender).await?;
        self.memberships
            .entry(player)
            .or_default()
            .insert(code.clone());
        Ok(())
    }

    /// Returns a handle to the session `code`.
    ///
    /// Callers can drop the manager lock and talk to the handle directly.
    pub fn handle(&self, code: &SessionCode) -> Result<SessionHandle, GameError> {
        self.sessions
            .get(code)
            .cloned()
            .ok_or_else(|| GameError::SessionNotFound(code.clone()))
    }

    /// Removes `player` from the session `code`, which ends the session
    /// for everyone.
    pub async fn leave_session(
        &mut self,
        player: PlayerId,
        code: &SessionCode,
    ) -> Result<(), GameError> {
        let handle = self.handle(code)?;
        handle.leave(player).await?;
        self.remove_session(code);
        Ok(())
    }

    /// Tears down every session `player` was seated in.
    ///
    /// Remaining members receive `playerLeft` first. Returns the codes of
    /// the removed sessions.
    pub async fn disconnect(&mut self, player: PlayerId) -> Vec<SessionCode> {
        let codes: Vec<SessionCode> = self
            .memberships
            .remove(&player)
            .map(|codes| codes.into_iter().collect())
            .unwrap_or_default();

        for code in &codes {
            if let Some(handle) = self.sessions.get(code).cloned() {
                if let Err(reason) = handle.leave(player).await {
                    tracing::debug!(%code, %player, %reason, "leave on disconnect failed");
                    let _ = handle.shutdown().await;
                }
            }
            self.remove_session(code);
        }
        codes
    }

    /// Drops a session and every membership that points at it.
    ///
    /// Returns `true` if the session existed.
    pub fn remove_session(&mut self, code: &SessionCode) -> bool {
        let existed = self.sessions.remove(code).is_some();
        for codes in self.memberships.values_mut() {
            codes.remove(code);
        }
        self.memberships.retain(|_, codes| !codes.is_empty());

        if existed {
            tracing::info!(%code, "session removed");
        }
        existed
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, code: &SessionCode) -> bool {
        self.sessions.contains_key(code)
    }

    /// Codes of the sessions `player` is seated in.
    pub fn sessions_of(&self, player: PlayerId) -> Vec<SessionCode> {
        self.memberships
            .get(&player)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default()
    }

}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// Draws a random code of `length` characters from [`CODE_ALPHABET`].
fn generate_code(length: usize) -> SessionCode {
    let mut rng = rand::rng();
    let code: String = (0..length)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect();
    SessionCode::new(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_generate_code_shape() {
        for _ in 0..100 {
            let code = generate_code(6);
            assert_eq!(code.as_str().len(), 6);
            assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_create_session_registers_host() {
        let mut manager = SessionManager::default();
        let (tx, _rx) = mpsc::unbounded_channel();

        let code = manager.create_session(PlayerId(1), tx).unwrap();
        assert!(manager.contains(&code));
        assert_eq!(manager.session_count(), 1);
        assert_eq!(manager.sessions_of(PlayerId(1)), vec![code]);
    }

    #[tokio::test]
    async fn test_create_session_codes_are_unique() {
        // A two-character code space is small enough to force collisions.
        let mut manager = SessionManager::new(SessionConfig {
            code_length: 2,
            ..SessionConfig::default()
        });
        let mut seen = HashSet::new();
        for i in 0..200 {
            let (tx, _rx) = mpsc::unbounded_channel();
            let code = manager.create_session(PlayerId(i), tx).unwrap();
            assert!(seen.insert(code));
        }
        assert_eq!(manager.session_count(), 200);
    }

    #[tokio::test]
    async fn test_create_session_gives_up_when_codes_run_out() {
        // A zero-length code space holds exactly one session.
        let mut manager = SessionManager::new(SessionConfig {
            code_length: 0,
            ..SessionConfig::default()
        });
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.create_session(PlayerId(1), tx.clone()).unwrap();

        assert_eq!(
            manager.create_session(PlayerId(2), tx),
            Err(GameError::NoFreeCode)
        );
        assert_eq!(manager.session_count(), 1);
        assert!(manager.sessions_of(PlayerId(2)).is_empty());
    }

    #[tokio::test]
    async fn test_handle_unknown_code() {
        let manager = SessionManager::default();
        let code = SessionCode::new("NOPE00");
        assert_eq!(
            manager.handle(&code).err(),
            Some(GameError::SessionNotFound(code))
        );
    }

    #[tokio::test]
    async fn test_remove_session_clears_memberships() {
        let mut manager = SessionManager::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let code = manager.create_session(PlayerId(1), tx).unwrap();

        assert!(manager.remove_session(&code));
        assert!(!manager.remove_session(&code));
        assert!(manager.sessions_of(PlayerId(1)).is_empty());
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_without_sessions_is_empty() {
        let mut manager = SessionManager::default();
        assert!(manager.disconnect(PlayerId(42)).await.is_empty());
    }
}

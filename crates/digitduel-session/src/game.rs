//! The game state machine for a single session.
//!
//! [`GameSession`] is plain data with synchronous methods. It never touches
//! channels or clocks: every operation returns the events it produced as an
//! [`Outbox`], and the session actor delivers them. That keeps every rule
//! testable without a runtime.

use digitduel_protocol::{
    GameStateView, GuessRecord, PlayerId, PlayerReady, Recipient, RevealedNumbers,
    ServerMessage, SessionCode,
};

use crate::rules::{self, Digits};
use crate::{GameError, SessionPhase};

/// Events produced by one operation, paired with who should receive them.
pub type Outbox = Vec<(Recipient, ServerMessage)>;

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// One of the two places at the table.
///
/// The host created the session, the guest joined it. Turns are tracked by
/// seat rather than by player id so flipping a turn can never land on a
/// third party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    Host,
    Guest,
}

impl Seat {
    /// The opposite seat.
    pub fn other(self) -> Self {
        match self {
            Self::Host => Self::Guest,
            Self::Guest => Self::Host,
        }
    }
}

#[derive(Debug, Clone)]
struct Player {
    id: PlayerId,
    secret: Option<Digits>,
}

impl Player {
    fn new(id: PlayerId) -> Self {
        Self { id, secret: None }
    }

    fn is_ready(&self) -> bool {
        self.secret.is_some()
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// The full state of one game.
///
/// A rejected operation returns a [`GameError`] and leaves the session
/// exactly as it was.
#[derive(Debug, Clone)]
pub struct GameSession {
    code: SessionCode,
    host: Player,
    guest: Option<Player>,
    /// `Some` once the game has started.
    turn: Option<Seat>,
    guesses: Vec<GuessRecord>,
    winner: Option<PlayerId>,
}

impl GameSession {
    /// Opens a session with `host` in the first seat.
    ///
    /// The outbox holds the `sessionCreated` answer for the host.
    pub fn open(code: SessionCode, host: PlayerId) -> (Self, Outbox) {
        let outbox = vec![(
            Recipient::Player(host),
            ServerMessage::SessionCreated {
                session_code: code.clone(),
                player_id: host,
            },
        )];
        let session = Self {
            code,
            host: Player::new(host),
            guest: None,
            turn: None,
            guesses: Vec::new(),
            winner: None,
        };
        (session, outbox)
    }

    /// Seats `player` as the guest.
    ///
    /// # Errors
    /// [`GameError::SessionFull`] if both seats are taken, even when
    /// `player` holds one of them, and [`GameError::AlreadyJoined`] if the
    /// host tries to join its own session.
    pub fn join(&mut self, player: PlayerId) -> Result<Outbox, GameError> {
        if !self.phase().is_joinable() {
            return Err(GameError::SessionFull(self.code.clone()));
        }
        if self.contains(player) {
            return Err(GameError::AlreadyJoined(player, self.code.clone()));
        }

        self.guest = Some(Player::new(player));
        tracing::info!(code = %self.code, %player, "player joined session");

        Ok(vec![
            (
                Recipient::Player(player),
                ServerMessage::SessionJoined {
                    session_code: self.code.clone(),
                    player_id: player,
                },
            ),
            (
                Recipient::All,
                ServerMessage::PlayerJoined {
                    player_count: self.player_count(),
                },
            ),
        ])
    }

    /// Locks `player`'s secret number.
    ///
    /// A player may replace their number until the game starts. When both
    /// seats are ready the game starts and the host moves first; this
    /// happens at most once per session.
    ///
    /// A request from someone who is not seated here is ignored: the
    /// outbox comes back empty and nothing changes.
    ///
    /// # Errors
    /// [`GameError::InvalidNumber`] if `number` is not four distinct digits,
    /// and [`GameError::NumberLocked`] once the game has started.
    pub fn set_number(
        &mut self,
        player: PlayerId,
        number: &str,
    ) -> Result<Outbox, GameError> {
        let digits = Digits::parse(number)?;

        let Some(seat) = self.seat_of(player) else {
            tracing::warn!(
                code = %self.code,
                %player,
                "setNumber from non-member, ignoring"
            );
            return Ok(Vec::new());
        };
        if self.is_started() {
            return Err(GameError::NumberLocked);
        }

        if let Some(seated) = self.player_mut(seat) {
            seated.secret = Some(digits);
        }
        tracing::debug!(code = %self.code, %player, "number locked");

        let mut outbox = vec![(
            Recipient::Player(player),
            ServerMessage::NumberSet { success: true },
        )];

        let both_ready = self.host.is_ready()
            && self.guest.as_ref().is_some_and(Player::is_ready);
        if both_ready {
            self.turn = Some(Seat::Host);
            tracing::info!(code = %self.code, first = %self.host.id, "game started");
            outbox.push((
                Recipient::All,
                ServerMessage::GameStart {
                    current_turn: self.host.id,
                },
            ));
        }

        Ok(outbox)
    }

    /// Scores `player`'s guess against the opponent's secret.
    ///
    /// A guess that matches all four positions wins: the winner is fixed
    /// and every member receives `gameOver` with both secrets. Otherwise
    /// the turn passes to the opponent and every member receives
    /// `guessResult`.
    ///
    /// `timestamp` is stamped onto the record as given.
    ///
    /// # Errors
    /// Checked in this order: [`GameError::GameNotStarted`],
    /// [`GameError::GameAlreadyOver`], [`GameError::NotYourTurn`],
    /// [`GameError::InvalidNumber`].
    pub fn make_guess(
        &mut self,
        player: PlayerId,
        guess: &str,
        timestamp: u64,
    ) -> Result<Outbox, GameError> {
        let turn = self.turn.ok_or(GameError::GameNotStarted)?;
        if self.winner.is_some() {
            return Err(GameError::GameAlreadyOver);
        }
        if self.seat_of(player) != Some(turn) {
            return Err(GameError::NotYourTurn);
        }
        let guess = Digits::parse(guess)?;

        let opponent = turn.other();
        let secret = self
            .player(opponent)
            .and_then(|p| p.secret)
            .ok_or(GameError::GameNotStarted)?;
        let score = rules::score(&guess, &secret);

        let record = GuessRecord {
            by_player: player,
            value: guess.to_string(),
            correct_digits: score.correct_digits,
            correct_positions: score.correct_positions,
            timestamp,
        };
        self.guesses.push(record.clone());

        if score.is_exact() {
            self.winner = Some(player);
            tracing::info!(
                code = %self.code,
                winner = %player,
                guesses = self.guesses.len(),
                "game finished"
            );
            let message = ServerMessage::GameOver {
                winner: player,
                guesses: self.guesses.clone(),
                numbers: self.revealed_numbers(),
            };
            return Ok(vec![(Recipient::All, message)]);
        }

        self.turn = Some(opponent);
        let next_turn = self
            .player(opponent)
            .map(|p| p.id)
            .ok_or(GameError::GameNotStarted)?;
        Ok(vec![(
            Recipient::All,
            ServerMessage::guess_result(&record, next_turn),
        )])
    }

    /// Removes `player` from the table.
    ///
    /// The session cannot continue with one player, so the caller is
    /// expected to discard it afterwards. The outbox tells the remaining
    /// members who left.
    ///
    /// # Errors
    /// [`GameError::NotAMember`] if `player` is not seated here.
    pub fn leave(&mut self, player: PlayerId) -> Result<Outbox, GameError> {
        if !self.contains(player) {
            return Err(GameError::NotAMember(player, self.code.clone()));
        }
        tracing::info!(code = %self.code, %player, "player left session");
        Ok(vec![(
            Recipient::AllExcept(player),
            ServerMessage::PlayerLeft { player_id: player },
        )])
    }

    /// A read-only view for `getGameState`. Secrets are not included.
    pub fn snapshot(&self) -> GameStateView {
        GameStateView {
            player_count: self.player_count(),
            game_started: self.is_started(),
            current_turn: self.current_turn(),
            guesses: self.guesses.clone(),
            winner: self.winner,
            players_ready: self
                .seated()
                .map(|p| PlayerReady {
                    id: p.id,
                    ready: p.is_ready(),
                })
                .collect(),
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Seated players, host first.
    pub fn members(&self) -> Vec<PlayerId> {
        self.seated().map(|p| p.id).collect()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.seat_of(player).is_some()
    }

    pub fn player_count(&self) -> usize {
        self.seated().count()
    }

    pub fn is_started(&self) -> bool {
        self.turn.is_some()
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn guesses(&self) -> &[GuessRecord] {
        &self.guesses
    }

    /// The player holding the turn. Stays on the winner once the game ends.
    pub fn current_turn(&self) -> Option<PlayerId> {
        self.turn.and_then(|seat| self.player(seat)).map(|p| p.id)
    }

    /// Which seat `player` occupies, if any.
    pub fn seat_of(&self, player: PlayerId) -> Option<Seat> {
        if self.host.id == player {
            Some(Seat::Host)
        } else if self.guest.as_ref().is_some_and(|g| g.id == player) {
            Some(Seat::Guest)
        } else {
            None
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.winner.is_some() {
            SessionPhase::Finished
        } else if self.is_started() {
            SessionPhase::InProgress
        } else if self.guest.is_some() {
            SessionPhase::ChoosingNumbers
        } else {
            SessionPhase::WaitingForOpponent
        }
    }

    // -- Internals --------------------------------------------------------

    fn seated(&self) -> impl Iterator<Item = &Player> {
        std::iter::once(&self.host).chain(self.guest.as_ref())
    }

    fn player(&self, seat: Seat) -> Option<&Player> {
        match seat {
            Seat::Host => Some(&self.host),
            Seat::Guest => self.guest.as_ref(),
        }
    }

    fn player_mut(&mut self, seat: Seat) -> Option<&mut Player> {
        match seat {
            Seat::Host => Some(&mut self.host),
            Seat::Guest => self.guest.as_mut(),
        }
    }

    fn revealed_numbers(&self) -> RevealedNumbers {
        self.seated()
            .filter_map(|p| p.secret.map(|secret| (p.id.0.to_string(), secret.to_string())))
            .collect()
    }
}

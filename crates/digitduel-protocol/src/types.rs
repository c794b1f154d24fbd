//! Core protocol types for digitduel's wire format.
//!
//! Every type here is serialized to JSON, sent over the WebSocket, and
//! deserialized on the other side. Field names are camelCase on the wire
//! so browser clients can read them without renaming.

use std::collections::BTreeMap;
use std::fmt;

use digitduel_transport::ConnectionId;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// A player *is* a connection: the id is the transport's [`ConnectionId`]
/// and stays valid until that connection closes. `#[serde(transparent)]`
/// makes `PlayerId(42)` travel as the plain number `42`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// The short, human-shareable code that addresses a session.
///
/// Codes are read aloud and typed by hand, so they are normalized on
/// construction: surrounding whitespace is dropped and letters are
/// upper-cased. `" k3x9qz "` and `"K3X9QZ"` name the same session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SessionCode(String);

impl SessionCode {
    /// Creates a normalized session code.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns the normalized code text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<&str> for SessionCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<SessionCode> for String {
    fn from(code: SessionCode) -> Self {
        code.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient — who should receive a message?
// ---------------------------------------------------------------------------

/// Specifies who inside a session should receive a server message.
///
/// The session engine returns `(Recipient, ServerMessage)` pairs and the
/// session actor fans them out to the members' outbound channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every member of the session.
    All,

    /// One specific member.
    Player(PlayerId),

    /// Every member except the given one.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Numbers on the wire
// ---------------------------------------------------------------------------

/// A secret number or guess as sent by a client.
///
/// Browsers tend to send these as JSON numbers (`1234`), which cannot
/// carry a leading zero. Strings (`"0123"`) are accepted as-is. Either way
/// the value is judged by its exact text form, so the number `123` is
/// the three-character text `"123"`, not `"0123"`.
///
/// Any other JSON scalar (`-123`, `12.5`, `true`, `null`) decodes to its
/// text form and is left for validation to reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NumberInput {
    /// Sent as a JSON string, or any scalar that is not a whole
    /// non-negative number.
    Text(String),
    /// Sent as a JSON number.
    Number(u64),
}

impl<'de> Deserialize<'de> for NumberInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NumberInputVisitor)
    }
}

struct NumberInputVisitor;

impl<'de> Visitor<'de> for NumberInputVisitor {
    type Value = NumberInput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a string of digits")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(NumberInput::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(NumberInput::Text(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(NumberInput::Number(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(match u64::try_from(v) {
            Ok(n) => NumberInput::Number(n),
            Err(_) => NumberInput::Text(v.to_string()),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(NumberInput::Text(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(NumberInput::Text(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(NumberInput::Text("null".to_string()))
    }
}

impl NumberInput {
    /// Returns the exact text form used for validation.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for NumberInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl fmt::Display for NumberInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Game records
// ---------------------------------------------------------------------------

/// One scored guess, as kept in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRecord {
    /// Who made the guess.
    pub by_player: PlayerId,
    /// The guessed 4-digit number.
    pub value: String,
    /// Guess digits that appear anywhere in the secret (0–4).
    pub correct_digits: u8,
    /// Guess digits that match the secret in value and position (0–4).
    pub correct_positions: u8,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// A player's readiness in a [`GameStateView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerReady {
    pub id: PlayerId,
    pub ready: bool,
}

/// Both secrets revealed when the game ends, keyed by the player id in
/// decimal: `{"1": "1234", "2": "5678"}`.
pub type RevealedNumbers = BTreeMap<String, String>;

/// Read-only snapshot of a session, answered to `getGameState`.
///
/// Secrets are never part of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub player_count: usize,
    pub game_started: bool,
    /// Whose turn it is. `None` until the game starts; after a win it
    /// stays on the winner.
    pub current_turn: Option<PlayerId>,
    pub guesses: Vec<GuessRecord>,
    pub winner: Option<PlayerId>,
    /// One entry per player, host first.
    pub players_ready: Vec<PlayerReady>,
}

// ---------------------------------------------------------------------------
// ClientMessage — client → server
// ---------------------------------------------------------------------------

/// Requests a client can make.
///
/// Internally tagged: `{ "type": "joinSession", "sessionCode": "K3X9QZ" }`.
/// Disconnecting needs no message — closing the socket is the signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Open a new session with the sender as host.
    CreateSession,

    /// Take the second seat of an existing session.
    JoinSession { session_code: SessionCode },

    /// Lock (or, before the game starts, replace) the sender's secret.
    SetNumber {
        session_code: SessionCode,
        number: NumberInput,
    },

    /// Guess the opponent's secret.
    MakeGuess {
        session_code: SessionCode,
        guess: NumberInput,
    },

    /// Ask for a snapshot of any session.
    GetGameState { session_code: SessionCode },

    /// Leave a session, which ends it for both players.
    LeaveSession { session_code: SessionCode },

    /// Keep-alive. `client_time` is echoed back for RTT measurement.
    Heartbeat { client_time: u64 },
}

// ---------------------------------------------------------------------------
// ServerMessage — server → client
// ---------------------------------------------------------------------------

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// To the creator only.
    SessionCreated {
        session_code: SessionCode,
        player_id: PlayerId,
    },

    /// To the joiner only.
    SessionJoined {
        session_code: SessionCode,
        player_id: PlayerId,
    },

    /// To every member, after a join.
    PlayerJoined { player_count: usize },

    /// To the player whose number was accepted.
    NumberSet { success: bool },

    /// To every member, once both secrets are locked.
    GameStart { current_turn: PlayerId },

    /// To every member, after a non-winning guess.
    GuessResult {
        by_player: PlayerId,
        value: String,
        correct_digits: u8,
        correct_positions: u8,
        timestamp: u64,
        next_turn: PlayerId,
    },

    /// To every member, after the winning guess.
    GameOver {
        winner: PlayerId,
        guesses: Vec<GuessRecord>,
        numbers: RevealedNumbers,
    },

    /// To the requester of `getGameState`.
    GameState(GameStateView),

    /// To the members left behind when someone disconnects or leaves.
    PlayerLeft { player_id: PlayerId },

    /// Answer to a heartbeat. `server_time` is milliseconds since the
    /// connection was accepted.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// To the requester of a rejected operation. `code` follows HTTP-style
    /// conventions (404 not found, 409 conflict, 422 invalid number, ...).
    Error { code: u16, message: String },
}

impl ServerMessage {
    /// Builds the `guessResult` event for a recorded guess.
    pub fn guess_result(record: &GuessRecord, next_turn: PlayerId) -> Self {
        Self::GuessResult {
            by_player: record.by_player,
            value: record.value.clone(),
            correct_digits: record.correct_digits,
            correct_positions: record.correct_positions,
            timestamp: record.timestamp,
            next_turn,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level message wrapper. Every message on the wire is an Envelope.
///
/// `P` is [`ClientMessage`] for inbound traffic and [`ServerMessage`] for
/// outbound. `seq` and `timestamp` may be omitted by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Per-direction sequence number.
    #[serde(default)]
    pub seq: u64,

    /// Sender-relative milliseconds. The server stamps the time since the
    /// connection was accepted.
    #[serde(default)]
    pub timestamp: u64,

    /// The message itself.
    pub payload: P,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client reads these exact JSON shapes, so the tests pin
    //! them down field by field.

    use super::*;
    use serde_json::json;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_player_id_from_connection_id() {
        assert_eq!(PlayerId::from(ConnectionId::new(9)), PlayerId(9));
    }

    #[test]
    fn test_session_code_normalizes_case_and_whitespace() {
        assert_eq!(SessionCode::new("  k3x9qz\n").as_str(), "K3X9QZ");
        assert_eq!(SessionCode::from("abc123"), SessionCode::new("ABC123"));
    }

    #[test]
    fn test_session_code_deserializes_normalized() {
        let code: SessionCode = serde_json::from_str(r#"" abc123 ""#).unwrap();
        assert_eq!(code.as_str(), "ABC123");
        assert_eq!(serde_json::to_string(&code).unwrap(), r#""ABC123""#);
    }

    // =====================================================================
    // NumberInput
    // =====================================================================

    #[test]
    fn test_number_input_accepts_string_and_number() {
        let text: NumberInput = serde_json::from_str(r#""0123""#).unwrap();
        assert_eq!(text.into_text(), "0123");

        let number: NumberInput = serde_json::from_str("1234").unwrap();
        assert_eq!(number.into_text(), "1234");
    }

    #[test]
    fn test_number_input_number_loses_leading_zero() {
        // What a browser sends after parseInt("0123").
        let number: NumberInput = serde_json::from_str("123").unwrap();
        assert_eq!(number.into_text(), "123");
    }

    #[test]
    fn test_number_input_keeps_negative_and_float_as_text() {
        let negative: NumberInput = serde_json::from_str("-123").unwrap();
        assert_eq!(negative, NumberInput::Text("-123".into()));

        let float: NumberInput = serde_json::from_str("12.5").unwrap();
        assert_eq!(float.into_text(), "12.5");

        let flag: NumberInput = serde_json::from_str("true").unwrap();
        assert_eq!(flag.into_text(), "true");
    }

    #[test]
    fn test_number_input_rejects_structured_values() {
        let result: Result<NumberInput, _> = serde_json::from_str("[1, 2, 3, 4]");
        assert!(result.is_err());
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_client_message_create_session_json_format() {
        let json = serde_json::to_value(ClientMessage::CreateSession).unwrap();
        assert_eq!(json, json!({ "type": "createSession" }));
    }

    #[test]
    fn test_client_message_set_number_parses_camel_case() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "setNumber",
            "sessionCode": "abc123",
            "number": 1234,
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetNumber {
                session_code: SessionCode::new("ABC123"),
                number: NumberInput::Number(1234),
            }
        );
    }

    #[test]
    fn test_client_message_set_number_keeps_float_for_validation() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "setNumber",
            "sessionCode": "ABC123",
            "number": 12.5,
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetNumber {
                session_code: SessionCode::new("ABC123"),
                number: NumberInput::Text("12.5".into()),
            }
        );
    }

    #[test]
    fn test_client_message_make_guess_with_string_guess() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "makeGuess",
            "sessionCode": "ABC123",
            "guess": "0987",
        }))
        .unwrap();
        match msg {
            ClientMessage::MakeGuess { guess, .. } => {
                assert_eq!(guess.into_text(), "0987");
            }
            other => panic!("expected MakeGuess, got {other:?}"),
        }
    }

    #[test]
    fn test_client_message_heartbeat_json_format() {
        let json = serde_json::to_value(ClientMessage::Heartbeat {
            client_time: 5000,
        })
        .unwrap();
        assert_eq!(json, json!({ "type": "heartbeat", "clientTime": 5000 }));
    }

    #[test]
    fn test_client_message_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({ "type": "flipTable" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_client_message_missing_session_code_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({ "type": "joinSession" }));
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerMessage
    // =====================================================================

    #[test]
    fn test_server_message_session_created_json_format() {
        let json = serde_json::to_value(ServerMessage::SessionCreated {
            session_code: SessionCode::new("K3X9QZ"),
            player_id: PlayerId(1),
        })
        .unwrap();
        assert_eq!(
            json,
            json!({
                "type": "sessionCreated",
                "sessionCode": "K3X9QZ",
                "playerId": 1,
            })
        );
    }

    #[test]
    fn test_server_message_guess_result_json_format() {
        let record = GuessRecord {
            by_player: PlayerId(1),
            value: "5679".into(),
            correct_digits: 3,
            correct_positions: 0,
            timestamp: 1_700_000_000_000,
        };
        let json =
            serde_json::to_value(ServerMessage::guess_result(&record, PlayerId(2)))
                .unwrap();
        assert_eq!(
            json,
            json!({
                "type": "guessResult",
                "byPlayer": 1,
                "value": "5679",
                "correctDigits": 3,
                "correctPositions": 0,
                "timestamp": 1_700_000_000_000u64,
                "nextTurn": 2,
            })
        );
    }

    #[test]
    fn test_server_message_game_over_round_trip() {
        let msg = ServerMessage::GameOver {
            winner: PlayerId(2),
            guesses: vec![GuessRecord {
                by_player: PlayerId(2),
                value: "1234".into(),
                correct_digits: 4,
                correct_positions: 4,
                timestamp: 10,
            }],
            numbers: RevealedNumbers::from([
                ("1".to_string(), "1234".to_string()),
                ("2".to_string(), "5678".to_string()),
            ]),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: ServerMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_server_message_game_over_numbers_keyed_by_player() {
        let msg = ServerMessage::GameOver {
            winner: PlayerId(1),
            guesses: vec![],
            numbers: RevealedNumbers::from([
                ("1".to_string(), "1234".to_string()),
                ("2".to_string(), "5678".to_string()),
            ]),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["numbers"], serde_json::json!({"1": "1234", "2": "5678"}));
    }

    #[test]
    fn test_server_message_game_state_flattens_view() {
        let view = GameStateView {
            player_count: 2,
            game_started: false,
            current_turn: None,
            guesses: vec![],
            winner: None,
            players_ready: vec![
                PlayerReady {
                    id: PlayerId(1),
                    ready: true,
                },
                PlayerReady {
                    id: PlayerId(2),
                    ready: false,
                },
            ],
        };
        let json =
            serde_json::to_value(ServerMessage::GameState(view.clone())).unwrap();
        assert_eq!(json["type"], "gameState");
        assert_eq!(json["playerCount"], 2);
        assert_eq!(json["gameStarted"], false);
        assert!(json["currentTurn"].is_null());
        assert_eq!(json["playersReady"][0], json!({ "id": 1, "ready": true }));

        let decoded: ServerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, ServerMessage::GameState(view));
    }

    #[test]
    fn test_server_message_error_json_format() {
        let json = serde_json::to_value(ServerMessage::Error {
            code: 404,
            message: "session ABC123 not found".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "session ABC123 not found");
    }

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_envelope_seq_and_timestamp_default_when_missing() {
        let env: Envelope<ClientMessage> = serde_json::from_value(json!({
            "payload": { "type": "createSession" }
        }))
        .unwrap();
        assert_eq!(env.seq, 0);
        assert_eq!(env.timestamp, 0);
        assert_eq!(env.payload, ClientMessage::CreateSession);
    }

    #[test]
    fn test_envelope_missing_payload_is_rejected() {
        let result: Result<Envelope<ClientMessage>, _> =
            serde_json::from_value(json!({ "seq": 1 }));
        assert!(result.is_err());
    }
}

//! Protocol message types for authority communication.

use crate::version::ProtocolVersion;
use crate::view::{GameSnapshot, OutcomeView};
use serde::{Deserialize, Serialize};
use xt3_core::{MoveError, PlayerToken, Seat, BOARD_CELLS};

/// Requests a participant can send to the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageType {
    /// Client handshake/connection request
    Connect {
        /// Client identifier (optional)
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },

    /// Claim a seat under a display name
    Register { name: String },

    /// Give up a seat
    Unregister { token: PlayerToken, name: String },

    /// Mark a cell (0-8)
    SubmitMove { cell: usize, token: PlayerToken },

    /// Start a new game on the same session
    Reset,

    /// Ask for the current outcome
    CurrentOutcome,

    /// Acknowledge a finished game
    GameDone,

    /// Ask for a full session snapshot
    Snapshot,

    /// Ping to check connection
    Ping {
        /// Sequence number for matching pong response
        seq: u64,
    },

    /// Client disconnecting gracefully
    Disconnect,
}

impl MessageType {
    /// Short name of the request kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Register { .. } => "register",
            Self::Unregister { .. } => "unregister",
            Self::SubmitMove { .. } => "submit_move",
            Self::Reset => "reset",
            Self::CurrentOutcome => "current_outcome",
            Self::GameDone => "game_done",
            Self::Snapshot => "snapshot",
            Self::Ping { .. } => "ping",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Messages sent from client to authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Protocol version
    pub protocol_version: ProtocolVersion,

    /// Message payload
    #[serde(flatten)]
    pub message: MessageType,
}

impl ClientMessage {
    /// Creates a new client message with current protocol version.
    pub fn new(message: MessageType) -> Self {
        Self {
            protocol_version: ProtocolVersion::CURRENT,
            message,
        }
    }

    pub fn connect(client_id: Option<String>) -> Self {
        Self::new(MessageType::Connect { client_id })
    }

    pub fn register(name: impl Into<String>) -> Self {
        Self::new(MessageType::Register { name: name.into() })
    }

    pub fn unregister(token: PlayerToken, name: impl Into<String>) -> Self {
        Self::new(MessageType::Unregister {
            token,
            name: name.into(),
        })
    }

    pub fn submit_move(cell: usize, token: PlayerToken) -> Self {
        Self::new(MessageType::SubmitMove { cell, token })
    }

    pub fn reset() -> Self {
        Self::new(MessageType::Reset)
    }

    pub fn current_outcome() -> Self {
        Self::new(MessageType::CurrentOutcome)
    }

    pub fn game_done() -> Self {
        Self::new(MessageType::GameDone)
    }

    pub fn snapshot() -> Self {
        Self::new(MessageType::Snapshot)
    }

    pub fn ping(seq: u64) -> Self {
        Self::new(MessageType::Ping { seq })
    }

    pub fn disconnect() -> Self {
        Self::new(MessageType::Disconnect)
    }
}

/// Messages sent from the authority to clients.
///
/// Most variants answer a request on the same connection. The four
/// push variants (`RosterChanged`, `BoardChanged`, `GameFinished`,
/// `ControlsHint`) are fan-out notifications sent to every registered
/// participant; see [`AuthorityMessage::is_push`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthorityMessage {
    /// Connection accepted
    Connected {
        /// Authority's protocol version
        protocol_version: ProtocolVersion,
        /// Assigned client ID
        client_id: String,
    },

    /// Connection rejected (version mismatch, too many connections)
    Rejected {
        /// Reason for rejection
        reason: String,
        /// Authority's protocol version (for client to upgrade)
        protocol_version: ProtocolVersion,
    },

    /// Seat granted
    Registered {
        token: PlayerToken,
        seat: Seat,
        mark: char,
    },

    /// Registration refused; carries the reserved invalid token
    SessionFull { token: PlayerToken },

    /// Seat released (also sent for unknown tokens)
    Unregistered,

    /// Move applied
    MoveAccepted { cell: usize },

    /// Move refused, nothing changed
    MoveRejected { error: MoveError },

    /// Board cleared, First to move
    ResetComplete,

    /// Answer to `current_outcome`
    Outcome { outcome: OutcomeView },

    /// Answer to `game_done`
    GameDoneAck,

    /// Answer to `snapshot`
    Snapshot { snapshot: GameSnapshot },

    /// Pong response to ping
    Pong {
        /// Sequence number from ping
        seq: u64,
    },

    /// Error response
    Error {
        /// Error message
        message: String,
        /// Error code (optional)
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Push: the set of registered names changed
    RosterChanged { names: Vec<String> },

    /// Push: the board changed
    BoardChanged { cells: [char; BOARD_CELLS] },

    /// Push: the game reached a win or a draw
    GameFinished,

    /// Push: whether the "New Game" control should be enabled
    ControlsHint { enabled: bool },
}

impl AuthorityMessage {
    pub fn connected(client_id: String) -> Self {
        Self::Connected {
            protocol_version: ProtocolVersion::CURRENT,
            client_id,
        }
    }

    pub fn rejected(reason: &str) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
            protocol_version: ProtocolVersion::CURRENT,
        }
    }

    pub fn registered(token: PlayerToken, seat: Seat) -> Self {
        Self::Registered {
            token,
            seat,
            mark: seat.symbol(),
        }
    }

    pub fn session_full() -> Self {
        Self::SessionFull {
            token: PlayerToken::INVALID,
        }
    }

    pub fn move_rejected(error: MoveError) -> Self {
        Self::MoveRejected { error }
    }

    pub fn outcome(outcome: OutcomeView) -> Self {
        Self::Outcome { outcome }
    }

    pub fn snapshot(snapshot: GameSnapshot) -> Self {
        Self::Snapshot { snapshot }
    }

    pub fn pong(seq: u64) -> Self {
        Self::Pong { seq }
    }

    pub fn error(message: &str) -> Self {
        Self::Error {
            message: message.to_string(),
            code: None,
        }
    }

    pub fn error_with_code(message: &str, code: &str) -> Self {
        Self::Error {
            message: message.to_string(),
            code: Some(code.to_string()),
        }
    }

    pub fn roster_changed(names: Vec<String>) -> Self {
        Self::RosterChanged { names }
    }

    pub fn board_changed(cells: [char; BOARD_CELLS]) -> Self {
        Self::BoardChanged { cells }
    }

    pub fn controls_hint(enabled: bool) -> Self {
        Self::ControlsHint { enabled }
    }

    /// Returns true for fan-out notifications.
    #[must_use]
    pub fn is_push(&self) -> bool {
        matches!(
            self,
            Self::RosterChanged { .. }
                | Self::BoardChanged { .. }
                | Self::GameFinished
                | Self::ControlsHint { .. }
        )
    }

    /// Short name of the message kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Rejected { .. } => "rejected",
            Self::Registered { .. } => "registered",
            Self::SessionFull { .. } => "session_full",
            Self::Unregistered => "unregistered",
            Self::MoveAccepted { .. } => "move_accepted",
            Self::MoveRejected { .. } => "move_rejected",
            Self::ResetComplete => "reset_complete",
            Self::Outcome { .. } => "outcome",
            Self::GameDoneAck => "game_done_ack",
            Self::Snapshot { .. } => "snapshot",
            Self::Pong { .. } => "pong",
            Self::Error { .. } => "error",
            Self::RosterChanged { .. } => "roster_changed",
            Self::BoardChanged { .. } => "board_changed",
            Self::GameFinished => "game_finished",
            Self::ControlsHint { .. } => "controls_hint",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_serialization() {
        let token = PlayerToken::generate();
        let msg = ClientMessage::submit_move(4, token);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"submit_move\""));
        assert!(json.contains("\"cell\":4"));
        assert!(json.contains(&token.to_string()));
        assert!(json.contains("\"protocol_version\":{\"major\":1,\"minor\":0}"));
    }

    #[test]
    fn test_unit_request_parses_from_minimal_json() {
        let json = r#"{"protocol_version":{"major":1,"minor":0},"type":"reset"}"#;
        let parsed: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.message, MessageType::Reset);
    }

    #[test]
    fn test_board_changed_wire_format() {
        let msg = AuthorityMessage::board_changed(['X', ' ', ' ', ' ', 'O', ' ', ' ', ' ', ' ']);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"board_changed","cells":["X"," "," "," ","O"," "," "," "," "]}"#
        );
    }

    #[test]
    fn test_session_full_carries_invalid_token() {
        match AuthorityMessage::session_full() {
            AuthorityMessage::SessionFull { token } => assert!(token.is_invalid()),
            other => panic!("Expected SessionFull, got {other:?}"),
        }
    }

    #[test]
    fn test_move_rejected_roundtrip() {
        let msg = AuthorityMessage::move_rejected(MoveError::NotYourTurn {
            expected: Seat::First,
        });
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: AuthorityMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_push_classification() {
        assert!(AuthorityMessage::GameFinished.is_push());
        assert!(AuthorityMessage::controls_hint(true).is_push());
        assert!(AuthorityMessage::roster_changed(vec![]).is_push());
        assert!(!AuthorityMessage::ResetComplete.is_push());
        assert!(!AuthorityMessage::pong(1).is_push());
    }
}

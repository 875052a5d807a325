//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is one JSON object tagged by `"type"`; field names are
//! camelCase to match the stored records.

use serde::{Serialize, Deserialize};

use crate::engine::{BootKind, ResetMode};
use crate::grid::{
    BotDelayRange, Cell, ClientSnapshot, EligibleUsersPage, MetaView, TargetCell, UserSummary,
};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
///
/// Missing fields fall back to safe defaults (empty id, no player, first
/// page) instead of failing the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Load or seed the board.
    Boot {
        /// Seed for a fresh board.
        #[serde(default)]
        seed: Option<i32>,
    },

    /// Poll the revealed cells.
    Snapshot,

    /// Reveal a cell.
    Reveal {
        /// Cell id, `r{row}-c{col}`.
        #[serde(default)]
        id: String,
        /// Acting player.
        #[serde(default)]
        player_id: Option<String>,
    },

    /// Take one bot step.
    BotStep,

    /// Regenerate the board.
    AdminReset {
        /// Advisory reset mode.
        #[serde(default)]
        mode: ResetMode,
        /// New seed.
        #[serde(default)]
        seed: Option<i32>,
    },

    /// Hidden targets.
    AdminTargets,

    /// Pick a random unplayed user as current player.
    PickRandomPlayer,

    /// Read the current player.
    GetCurrentPlayer,

    /// Set or clear the current player.
    SetCurrentPlayer {
        /// New current player; absent or null clears.
        #[serde(default)]
        player_id: Option<String>,
    },

    /// Page through unplayed users.
    EligibleUsers {
        /// Skip this many.
        #[serde(default)]
        offset: Option<usize>,
        /// Page size.
        #[serde(default)]
        limit: Option<usize>,
        /// Substring filter over id or name.
        #[serde(default)]
        query: Option<String>,
    },

    /// Map this client to a display identity.
    AssignUser {
        /// Opaque client id; one is minted if absent.
        #[serde(default)]
        client_id: Option<String>,
    },

    /// Names for a list of user ids.
    ResolveUsers {
        /// User ids.
        #[serde(default)]
        ids: Vec<String>,
    },

    /// Read the bot delay window.
    GetBotDelay,

    /// Replace the bot delay window.
    SetBotDelay {
        /// Lower bound in ms.
        #[serde(default)]
        min_ms: Option<f64>,
        /// Upper bound in ms.
        #[serde(default)]
        max_ms: Option<f64>,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        #[serde(default)]
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Boot finished.
    Booted {
        /// How the board was obtained.
        kind: BootKind,
    },

    /// Polling snapshot.
    Snapshot(ClientSnapshot),

    /// Reveal accepted.
    Revealed {
        /// Opened cell.
        cell: Cell,
        /// Meta after the reveal.
        meta: MetaView,
    },

    /// Bot step finished.
    BotStepped {
        /// Cell opened by the bot, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revealed: Option<Cell>,
        /// Meta after the step.
        meta: MetaView,
        /// Reveal order exhausted.
        done: bool,
    },

    /// Reset finished.
    ResetDone {
        /// Meta of the new board.
        meta: MetaView,
    },

    /// Hidden targets.
    Targets {
        /// Targets, row-major.
        targets: Vec<TargetCell>,
    },

    /// Random pick result.
    PlayerPicked {
        /// Chosen user.
        player_id: String,
    },

    /// Current player.
    CurrentPlayer {
        /// Current player, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_player_id: Option<String>,
    },

    /// Mutation accepted with nothing else to report.
    Ok,

    /// Page of unplayed users.
    EligibleUsers(EligibleUsersPage),

    /// Identity assigned to this client.
    AssignedUser {
        /// User id.
        user_id: String,
        /// Display name.
        name: String,
        /// Client id used (minted if the request had none).
        client_id: String,
    },

    /// Resolved users.
    ResolvedUsers {
        /// Known users in request order.
        users: Vec<UserSummary>,
    },

    /// Bot delay window.
    BotDelay(BotDelayRange),

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server time in ms since the epoch.
        server_time: u64,
    },

    /// Request failed.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Reason.
        reason: String,
    },
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// HTTP-equivalent status.
    pub status: u16,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Error with the status implied by `code`.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, status: code.status(), message: message.into() }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Cell id not on the board.
    NotFound,
    /// Cell already opened.
    AlreadyRevealed,
    /// Player already used their reveal.
    AlreadyPlayed,
    /// Player unknown or not selectable.
    NotEligible,
    /// Someone else's turn.
    NotYourTurn,
    /// Nobody left to pick.
    NoEligible,
    /// No board loaded.
    NotBooted,
    /// Frame could not be decoded or lacks required fields.
    InvalidInput,
    /// Fault inside the server.
    InternalError,
}

impl ErrorCode {
    /// HTTP-equivalent status.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::NotFound | ErrorCode::NoEligible => 404,
            ErrorCode::AlreadyRevealed | ErrorCode::AlreadyPlayed => 409,
            ErrorCode::NotEligible | ErrorCode::NotYourTurn => 403,
            ErrorCode::NotBooted => 503,
            ErrorCode::InvalidInput => 400,
            ErrorCode::InternalError => 500,
        }
    }
}

impl From<crate::grid::ErrorCode> for ErrorCode {
    fn from(code: crate::grid::ErrorCode) -> Self {
        use crate::grid::ErrorCode as Domain;
        match code {
            Domain::NotFound => ErrorCode::NotFound,
            Domain::AlreadyRevealed => ErrorCode::AlreadyRevealed,
            Domain::AlreadyPlayed => ErrorCode::AlreadyPlayed,
            Domain::NotEligible => ErrorCode::NotEligible,
            Domain::NotYourTurn => ErrorCode::NotYourTurn,
            Domain::NoEligible => ErrorCode::NoEligible,
            Domain::NotBooted => ErrorCode::NotBooted,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Error frame.
    pub fn error(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError::new(code.into(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_request_shape() {
        let msg = ClientMessage::from_json(r#"{"type":"reveal","id":"r0-c1","playerId":"u00001"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Reveal { id: "r0-c1".to_string(), player_id: Some("u00001".to_string()) }
        );
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let msg = ClientMessage::from_json(r#"{"type":"reveal"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Reveal { id: String::new(), player_id: None });

        let msg = ClientMessage::from_json(r#"{"type":"admin_reset"}"#).unwrap();
        assert_eq!(msg, ClientMessage::AdminReset { mode: ResetMode::Hard, seed: None });

        let msg = ClientMessage::from_json(r#"{"type":"set_current_player","playerId":null}"#).unwrap();
        assert_eq!(msg, ClientMessage::SetCurrentPlayer { player_id: None });
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_set_bot_delay_fields() {
        let msg = ClientMessage::from_json(r#"{"type":"set_bot_delay","minMs":100,"maxMs":250.7}"#).unwrap();
        assert_eq!(msg, ClientMessage::SetBotDelay { min_ms: Some(100.0), max_ms: Some(250.7) });
    }

    #[test]
    fn test_error_frame() {
        let msg = ServerMessage::error(crate::grid::ErrorCode::AlreadyRevealed, "cell already revealed");
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""code":"ALREADY_REVEALED""#));
        assert!(json.contains(r#""status":409"#));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::NotFound.status(), 404);
        assert_eq!(ErrorCode::AlreadyPlayed.status(), 409);
        assert_eq!(ErrorCode::NotYourTurn.status(), 403);
        assert_eq!(ErrorCode::NotEligible.status(), 403);
        assert_eq!(ErrorCode::NoEligible.status(), 404);
        assert_eq!(ErrorCode::NotBooted.status(), 503);
        assert_eq!(ErrorCode::InvalidInput.status(), 400);
        assert_eq!(ErrorCode::InternalError.status(), 500);
    }

    #[test]
    fn test_server_message_json_roundtrip() {
        let msg = ServerMessage::BotDelay(BotDelayRange { min_ms: 300, max_ms: 1500 });
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""minMs":300"#));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);

        let msg = ServerMessage::AssignedUser {
            user_id: "u00042".to_string(),
            name: "Kalor".to_string(),
            client_id: "cid-1".to_string(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""userId":"u00042""#));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }
}

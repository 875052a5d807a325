//! Domain outcomes.
//!
//! These are expected results, returned as values and matched exhaustively
//! by the boundary. Faults (calling before boot, storage failures) are
//! `GridError` in the engine instead.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Wire code for every domain outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Cell id not on the board.
    NotFound,
    /// Cell was already opened.
    AlreadyRevealed,
    /// Player already used their reveal.
    AlreadyPlayed,
    /// Player is unknown or cannot be selected.
    NotEligible,
    /// Turn gating is on and it is someone else's turn.
    NotYourTurn,
    /// No unplayed user left to pick.
    NoEligible,
    /// No board loaded.
    NotBooted,
}

impl ErrorCode {
    /// Wire string, e.g. `"NOT_FOUND"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyRevealed => "ALREADY_REVEALED",
            ErrorCode::AlreadyPlayed => "ALREADY_PLAYED",
            ErrorCode::NotEligible => "NOT_ELIGIBLE",
            ErrorCode::NotYourTurn => "NOT_YOUR_TURN",
            ErrorCode::NoEligible => "NO_ELIGIBLE",
            ErrorCode::NotBooted => "NOT_BOOTED",
        }
    }
}

/// Why a reveal was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RevealError {
    /// No such cell.
    #[error("cell not found")]
    NotFound,
    /// Cell already opened.
    #[error("cell already revealed")]
    AlreadyRevealed,
    /// Player already revealed a cell.
    #[error("player already played")]
    AlreadyPlayed,
    /// Player not in the roster.
    #[error("player not eligible")]
    NotEligible,
    /// Turn gating rejected the player.
    #[error("not this player's turn")]
    NotYourTurn,
}

impl RevealError {
    /// Wire code.
    pub fn code(self) -> ErrorCode {
        match self {
            RevealError::NotFound => ErrorCode::NotFound,
            RevealError::AlreadyRevealed => ErrorCode::AlreadyRevealed,
            RevealError::AlreadyPlayed => ErrorCode::AlreadyPlayed,
            RevealError::NotEligible => ErrorCode::NotEligible,
            RevealError::NotYourTurn => ErrorCode::NotYourTurn,
        }
    }
}

/// Why a bot step could not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BotError {
    /// No board loaded.
    #[error("board not booted")]
    NotBooted,
}

impl BotError {
    /// Wire code.
    pub fn code(self) -> ErrorCode {
        match self {
            BotError::NotBooted => ErrorCode::NotBooted,
        }
    }
}

/// Why a random pick failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PickError {
    /// Everyone has played.
    #[error("no eligible users")]
    NoEligible,
}

impl PickError {
    /// Wire code.
    pub fn code(self) -> ErrorCode {
        match self {
            PickError::NoEligible => ErrorCode::NoEligible,
        }
    }
}

/// Why a current-player selection was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectError {
    /// Unknown or already played.
    #[error("player not eligible")]
    NotEligible,
}

impl SelectError {
    /// Wire code.
    pub fn code(self) -> ErrorCode {
        match self {
            SelectError::NotEligible => ErrorCode::NotEligible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_as_wire_strings() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::AlreadyRevealed,
            ErrorCode::AlreadyPlayed,
            ErrorCode::NotEligible,
            ErrorCode::NotYourTurn,
            ErrorCode::NoEligible,
            ErrorCode::NotBooted,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, serde_json::Value::String(code.as_str().to_string()));
        }
    }

    #[test]
    fn test_reveal_error_codes() {
        assert_eq!(RevealError::AlreadyRevealed.code().as_str(), "ALREADY_REVEALED");
        assert_eq!(RevealError::NotEligible.code(), ErrorCode::NotEligible);
        assert_eq!(PickError::NoEligible.code().as_str(), "NO_ELIGIBLE");
        assert_eq!(BotError::NotBooted.code().as_str(), "NOT_BOOTED");
    }
}

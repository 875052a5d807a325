//! Cells and Prizes
//!
//! A cell is addressed by `(row, col)` and written on the wire as its
//! canonical id `r{row}-c{col}`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize, Serializer, Deserializer};

// =============================================================================
// CELL ID
// =============================================================================

/// Canonical cell identifier.
///
/// Orders row-major, so a `BTreeMap<CellId, _>` iterates the board
/// top-left to bottom-right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId {
    /// Zero-based row.
    pub row: u32,
    /// Zero-based column.
    pub col: u32,
}

impl CellId {
    /// Create from coordinates.
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse `r{row}-c{col}`; anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix('r')?;
        let (row, col) = rest.split_once("-c")?;
        if !is_plain_number(row) || !is_plain_number(col) {
            return None;
        }
        Some(Self::new(row.parse().ok()?, col.parse().ok()?))
    }
}

/// Digits only, no sign, no leading zeros (except "0" itself).
fn is_plain_number(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && (s == "0" || !s.starts_with('0'))
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}-c{}", self.row, self.col)
    }
}

/// Error returned when a string is not a canonical cell id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cell id: {0:?}")]
pub struct ParseCellIdError(pub String);

impl FromStr for CellId {
    type Err = ParseCellIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellId::parse(s).ok_or_else(|| ParseCellIdError(s.to_string()))
    }
}

impl Serialize for CellId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// PRIZES
// =============================================================================

/// Amount of the single grand prize.
pub const GRAND_AMOUNT: u32 = 25_000;

/// Amount of each consolation prize.
pub const CONSOLATION_AMOUNT: u32 = 100;

/// Maximum consolation prizes per board.
pub const CONSOLATION_CAP: usize = 100;

/// Prize tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeKind {
    /// Nothing behind this cell.
    None,
    /// Small prize.
    Consolation,
    /// The one big prize.
    Grand,
}

impl PrizeKind {
    /// Fixed payout of this tier.
    pub const fn amount(self) -> u32 {
        match self {
            PrizeKind::None => 0,
            PrizeKind::Consolation => CONSOLATION_AMOUNT,
            PrizeKind::Grand => GRAND_AMOUNT,
        }
    }
}

/// Tagged prize value as shown to players: `{type, amount}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prize {
    /// Tier.
    #[serde(rename = "type")]
    pub kind: PrizeKind,
    /// Payout; always `kind.amount()`.
    pub amount: u32,
}

impl Prize {
    /// Empty cell.
    pub const NONE: Prize = Prize::of(PrizeKind::None);
    /// Consolation prize.
    pub const CONSOLATION: Prize = Prize::of(PrizeKind::Consolation);
    /// Grand prize.
    pub const GRAND: Prize = Prize::of(PrizeKind::Grand);

    /// Prize for a tier.
    pub const fn of(kind: PrizeKind) -> Self {
        Self { kind, amount: kind.amount() }
    }

    /// Whether this prize pays out anything.
    pub fn is_target(&self) -> bool {
        self.kind != PrizeKind::None
    }
}

// =============================================================================
// CELL
// =============================================================================

/// One board cell.
///
/// `prize`, `revealed_by` and `revealed_at` are only ever set together with
/// `revealed`, and a revealed cell never goes back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Canonical id.
    pub id: CellId,
    /// Row, duplicated from `id` for clients.
    pub row: u32,
    /// Column, duplicated from `id` for clients.
    pub col: u32,
    /// Whether the cell has been opened.
    pub revealed: bool,
    /// Prize found here (revealed cells only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<Prize>,
    /// Player or user credited with the reveal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_by: Option<String>,
    /// When the reveal happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_at: Option<DateTime<Utc>>,
}

impl Cell {
    /// Fresh unrevealed cell.
    pub fn new(id: CellId) -> Self {
        Self {
            id,
            row: id.row,
            col: id.col,
            revealed: false,
            prize: None,
            revealed_by: None,
            revealed_at: None,
        }
    }

    /// Transition to revealed. Caller has checked `!self.revealed`.
    pub(crate) fn reveal(&mut self, prize: Prize, by: Option<String>, at: DateTime<Utc>) {
        debug_assert!(!self.revealed, "cell {} revealed twice", self.id);
        self.revealed = true;
        self.prize = Some(prize);
        self.revealed_by = by;
        self.revealed_at = Some(at);
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Reveal Engine
//!
//! Validates and applies a single reveal. Checks run in a fixed order and
//! the first failing one wins:
//!
//! 0. turn gating (only when `enforce_turn` is set)
//! 1. eligibility of a human player (unless bypassed)
//! 2. cell exists
//! 3. cell still unrevealed
//!
//! A successful reveal bumps the board version exactly once.

use chrono::{DateTime, Utc};

use crate::grid::board::Board;
use crate::grid::cell::{Cell, CellId, Prize};
use crate::grid::error::RevealError;
use crate::grid::state::MetaView;

/// Nominal identity used by the bot.
pub const BOT_PLAYER_ID: &str = "bot";

/// Options for trusted callers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevealOptions {
    /// Credit the reveal to this identity instead of the player id.
    pub override_revealed_by: Option<String>,
    /// Skip the human eligibility checks.
    pub bypass_eligibility: bool,
    /// Reject players other than `meta.current_player_id` when one is set.
    pub enforce_turn: bool,
}

impl RevealOptions {
    /// Bot reveal credited to `user`.
    pub fn bot_for(user: Option<String>) -> Self {
        Self {
            override_revealed_by: user,
            bypass_eligibility: true,
            enforce_turn: false,
        }
    }
}

/// Successful reveal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revealed {
    /// Cell after the reveal.
    pub cell: Cell,
    /// Meta after the version bump.
    pub meta: MetaView,
}

/// Player id that names a human (not absent, empty or the bot).
fn human(player_id: Option<&str>) -> Option<&str> {
    player_id.filter(|p| !p.is_empty() && *p != BOT_PLAYER_ID)
}

impl Board {
    /// Reveal cell `id` on behalf of `player_id`.
    pub fn reveal_cell(
        &mut self,
        id: &str,
        player_id: Option<&str>,
        options: &RevealOptions,
        now: DateTime<Utc>,
    ) -> Result<Revealed, RevealError> {
        let acting = human(player_id);
        let checked = if options.bypass_eligibility { None } else { acting };

        if let Some(player) = checked {
            if options.enforce_turn {
                if let Some(current) = self.state.meta.current_player_id.as_deref() {
                    if current != player {
                        return Err(RevealError::NotYourTurn);
                    }
                }
            }
            let user = self.users.get(player).ok_or(RevealError::NotEligible)?;
            if user.played || self.owns_revealed_cell(player) {
                return Err(RevealError::AlreadyPlayed);
            }
        }

        let cell_id = CellId::parse(id).ok_or(RevealError::NotFound)?;
        let prize = self.targets.get(&cell_id).copied().unwrap_or(Prize::NONE);
        let revealed_by = options
            .override_revealed_by
            .clone()
            .or_else(|| player_id.filter(|p| !p.is_empty()).map(str::to_string));

        let cell = self.state.cells.get_mut(&cell_id).ok_or(RevealError::NotFound)?;
        if cell.revealed {
            return Err(RevealError::AlreadyRevealed);
        }
        cell.reveal(prize, revealed_by.clone(), now);
        let cell = cell.clone();

        self.state.meta.opened_count += 1;
        if let Some(player) = checked {
            self.users.mark_played(player);
        }
        if let Some(credited) = human(revealed_by.as_deref()) {
            self.users.mark_played(credited);
        }
        self.state.meta.bump_version();

        Ok(Revealed { cell, meta: self.state.meta.view(self.state.total()) })
    }

    /// Whether any revealed cell is credited to `player`.
    fn owns_revealed_cell(&self, player: &str) -> bool {
        self.state
            .cells
            .values()
            .any(|c| c.revealed && c.revealed_by.as_deref() == Some(player))
    }
}

// =============================================================================
// TESTS
// =============================================================================

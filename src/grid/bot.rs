//! Bot Stepper
//!
//! One bot step opens the next unrevealed cell of the seeded reveal order
//! and credits it to a deterministically chosen user. The simulated delay
//! is handled by the caller; this module only computes it.

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::rng::SeedStream;
use crate::grid::board::Board;
use crate::grid::cell::Cell;
use crate::grid::reveal::{RevealOptions, BOT_PLAYER_ID};
use crate::grid::seed::next_bot_reveal;
use crate::grid::state::MetaView;
use crate::grid::users::UserRoster;

/// Default lower bound of the simulated delay.
pub const DEFAULT_BOT_MIN_MS: u64 = 300;
/// Default upper bound of the simulated delay.
pub const DEFAULT_BOT_MAX_MS: u64 = 1500;

// =============================================================================
// DELAY
// =============================================================================

/// Inclusive window for the simulated bot latency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotDelayRange {
    /// Lower bound in milliseconds.
    pub min_ms: u64,
    /// Upper bound in milliseconds, never below `min_ms`.
    pub max_ms: u64,
}

impl Default for BotDelayRange {
    fn default() -> Self {
        Self { min_ms: DEFAULT_BOT_MIN_MS, max_ms: DEFAULT_BOT_MAX_MS }
    }
}

impl BotDelayRange {
    /// Clamped range: negatives become 0, `max` is raised to `min`.
    pub fn new(min_ms: i64, max_ms: i64) -> Self {
        let min_ms = min_ms.max(0) as u64;
        let max_ms = (max_ms.max(0) as u64).max(min_ms);
        Self { min_ms, max_ms }
    }

    /// `[0.5 * interval, 1.5 * interval]`, used when autoplay sets a cadence.
    pub fn around_interval(interval_ms: u64) -> Self {
        Self {
            min_ms: interval_ms / 2,
            max_ms: interval_ms.saturating_add(interval_ms / 2),
        }
    }

    /// Delay before the bot step taken at `version`.
    pub fn delay_for(&self, seed: i32, version: u64) -> Duration {
        let mut rng = SeedStream::BotDelay { version }.rng(seed);
        Duration::from_millis(rng.next_int_range(self.min_ms, self.max_ms))
    }
}

// =============================================================================
// ATTRIBUTION
// =============================================================================

/// User credited with the bot reveal at cursor `index`.
///
/// Starts at a seeded offset and walks forward (wrapping) to the first
/// unplayed user; if everyone has played, the starting user is used.
pub fn attribution_user(users: &UserRoster, seed: i32, index: usize) -> Option<String> {
    if users.is_empty() {
        return None;
    }
    let len = users.len();
    let start = SeedStream::BotStep { index }.rng(seed).next_int(len);
    let chosen = (0..len)
        .filter_map(|offset| users.at((start + offset) % len))
        .find(|u| !u.played)
        .or_else(|| users.at(start))?;
    Some(chosen.id.clone())
}

// =============================================================================
// STEP
// =============================================================================

/// Outcome of one bot step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotStep {
    /// Cell opened by this step.
    pub revealed: Option<Cell>,
    /// Meta after the step.
    pub meta: MetaView,
    /// Reveal order exhausted.
    pub done: bool,
}

impl Board {
    /// Take one bot step (after the caller has waited out the delay).
    ///
    /// The cursor always moves past every inspected position. Only an
    /// actual reveal bumps the version.
    pub fn bot_step(&mut self, now: DateTime<Utc>) -> BotStep {
        let next = next_bot_reveal(&self.state);
        self.state.meta.reveal_index = next.index;

        let Some(id) = next.id else {
            return BotStep {
                revealed: None,
                meta: self.state.meta.view(self.state.total()),
                done: true,
            };
        };

        let user = attribution_user(&self.users, self.state.meta.seed, next.index);
        let options = RevealOptions::bot_for(user);
        match self.reveal_cell(&id.to_string(), Some(BOT_PLAYER_ID), &options, now) {
            Ok(revealed) => BotStep {
                revealed: Some(revealed.cell),
                meta: revealed.meta,
                done: false,
            },
            Err(_) => BotStep {
                revealed: None,
                meta: self.state.meta.view(self.state.total()),
                done: false,
            },
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Grid Engine
//!
//! Owns the live [`Board`](crate::grid::Board) behind one async mutex and
//! writes every committed change through to a
//! [`KeyValueStore`](crate::store::KeyValueStore) before returning.

pub mod clock;
pub mod service;
pub mod driver;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::grid::{BoardShape, BotDelayRange};
use crate::store::{Collection, StorageError};

pub use clock::{Clock, FixedClock, SystemClock};
pub use service::{BootKind, GridService};
pub use driver::{BotDriver, DriverSummary};

/// Board configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridConfig {
    /// Board rows.
    pub rows: u32,
    /// Board columns.
    pub cols: u32,
    /// Roster size.
    pub user_count: usize,
    /// Seed used when boot or reset is given none.
    pub default_seed: Option<i32>,
    /// Initial bot delay window.
    pub bot_delay: BotDelayRange,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            cols: 100,
            user_count: 10_000,
            default_seed: None,
            bot_delay: BotDelayRange::default(),
        }
    }
}

impl GridConfig {
    /// Board shape for generation.
    pub fn shape(&self) -> BoardShape {
        BoardShape { rows: self.rows, cols: self.cols, user_count: self.user_count }
    }
}

/// Reset flavour requested by an admin.
///
/// Both perform a full regeneration; the mode is only recorded in the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    /// Requested soft reset.
    Soft,
    /// Requested hard reset.
    #[default]
    Hard,
}

/// Faults: sequencing bugs and storage failures. Never a game outcome.
#[derive(Debug, Error)]
pub enum GridError {
    /// Operation needs a board and none is loaded.
    #[error("board not booted")]
    NotBooted,

    /// Operation needs users and the roster is empty.
    #[error("users not initialized")]
    UsersNotInitialized,

    /// Store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored collection could not be decoded.
    #[error("corrupt {collection:?} collection: {source}")]
    Corrupt {
        /// Collection that failed.
        collection: Collection,
        /// Decode error.
        #[source]
        source: serde_json::Error,
    },
}

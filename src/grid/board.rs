//! Board
//!
//! The authoritative in-memory copy: grid state, hidden targets and the
//! user roster, owned together. Every mutation goes through methods on
//! [`Board`]; readers get views or clones, never the live records.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher};
use crate::grid::cell::{Cell, CellId, Prize};
use crate::grid::seed::{seed_grid, targets_for, Targets};
use crate::grid::state::{GridState, StoredMeta, VersionTag};
use crate::grid::users::UserRoster;

/// Size and population of a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardShape {
    /// Rows.
    pub rows: u32,
    /// Columns.
    pub cols: u32,
    /// Users in the roster.
    pub user_count: usize,
}

impl Default for BoardShape {
    fn default() -> Self {
        Self { rows: 100, cols: 100, user_count: 10_000 }
    }
}

/// What the client poller sees. Never contains unrevealed cells or targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    /// Version and etag.
    pub meta: VersionTag,
    /// Revealed cells, row-major.
    pub revealed: Vec<Cell>,
    /// Revealed count.
    pub opened_count: u64,
    /// Cells on the board.
    pub total: usize,
}

/// Hidden target with coordinates (admin view).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCell {
    /// Cell id.
    pub id: CellId,
    /// Row.
    pub row: u32,
    /// Column.
    pub col: u32,
    /// Prize behind it.
    pub prize: Prize,
}

/// Board rebuilt from storage, with what had to be filled in.
#[derive(Debug)]
pub struct RestoredBoard {
    /// The board.
    pub board: Board,
    /// Meta came from an older schema and was normalized.
    pub meta_backfilled: bool,
    /// Roster was missing and was generated.
    pub users_generated: bool,
}

/// Live board.
#[derive(Clone, Debug)]
pub struct Board {
    pub(crate) state: GridState,
    pub(crate) targets: Targets,
    pub(crate) users: UserRoster,
}

impl Board {
    /// Fresh board from a seed (`None` = default seed).
    pub fn generate(shape: BoardShape, seed: Option<i32>) -> Self {
        let seeded = seed_grid(shape.rows, shape.cols, seed);
        let users = UserRoster::generate(shape.user_count, seeded.state.meta.seed);
        Self { state: seeded.state, targets: seeded.targets, users }
    }

    /// Rebuild from stored collections.
    ///
    /// Targets are always recomputed from the stored seed for the stored
    /// board's dimensions; a stored copy is never trusted.
    pub fn restore(
        cells: BTreeMap<CellId, Cell>,
        meta: StoredMeta,
        users: Option<UserRoster>,
        user_count: usize,
    ) -> RestoredBoard {
        let normalized = meta.normalize(&cells);
        let state = GridState { cells, meta: normalized.meta };
        let (rows, cols) = state.dimensions();
        let targets = targets_for(rows, cols, state.meta.seed);

        let users_generated = users.is_none();
        let users = users.unwrap_or_else(|| UserRoster::generate(user_count, state.meta.seed));

        RestoredBoard {
            board: Self { state, targets, users },
            meta_backfilled: normalized.backfilled,
            users_generated,
        }
    }

    /// Grid state (read-only).
    pub fn state(&self) -> &GridState {
        &self.state
    }

    /// User roster (read-only).
    pub fn users(&self) -> &UserRoster {
        &self.users
    }

    /// Board seed.
    pub fn seed(&self) -> i32 {
        self.state.meta.seed
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.state.meta.version()
    }

    /// Polling snapshot.
    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            meta: VersionTag {
                version: self.state.meta.version(),
                etag: self.state.meta.etag().to_string(),
            },
            revealed: self.state.revealed().cloned().collect(),
            opened_count: self.state.meta.opened_count,
            total: self.state.total(),
        }
    }

    /// Hidden targets, row-major. Admin only.
    pub fn admin_targets(&self) -> Vec<TargetCell> {
        self.targets
            .iter()
            .filter(|(id, _)| self.state.cells.contains_key(id))
            .map(|(&id, &prize)| TargetCell { id, row: id.row, col: id.col, prize })
            .collect()
    }

    /// Digest over cells, meta and users.
    pub fn digest(&self) -> StateHash {
        let mut h = StateHasher::for_board();
        let meta = &self.state.meta;
        h.update_u64(meta.version());
        h.update_i32(meta.seed);
        h.update_u64(meta.reveal_index as u64);
        h.update_u64(meta.opened_count);
        h.update_opt_str(meta.current_player_id.as_deref());
        h.update_u64(meta.reveal_order.len() as u64);
        for id in &meta.reveal_order {
            h.update_u32(id.row);
            h.update_u32(id.col);
        }
        for cell in self.state.cells.values() {
            h.update_u32(cell.row);
            h.update_u32(cell.col);
            h.update_bool(cell.revealed);
            h.update_u32(cell.prize.map(|p| p.amount).unwrap_or(0));
            h.update_opt_str(cell.revealed_by.as_deref());
            h.update_opt_str(cell.revealed_at.map(|t| t.to_rfc3339()).as_deref());
        }
        for user in self.users.iter() {
            h.update_str(&user.id);
            h.update_str(&user.name);
            h.update_bool(user.played);
        }
        h.finalize()
    }
}

// =============================================================================
// TESTS
// =============================================================================

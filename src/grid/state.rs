//! Board State Definitions
//!
//! `GridState` is the unit of persistence and of optimistic-concurrency
//! comparison: clients compare the `etag` to detect staleness.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::rng::DEFAULT_SEED;
use crate::grid::cell::{Cell, CellId};
use crate::grid::seed::reveal_order;

/// Etag for a version. Always derived, never stored independently.
pub fn make_etag(version: u64) -> String {
    format!("v-{version}")
}

// =============================================================================
// GRID META
// =============================================================================

/// Board-level metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridMeta {
    version: u64,
    etag: String,
    /// Seed the board (targets, order, users) was generated from.
    pub seed: i32,
    /// Permutation of every cell id, consumed by the bot.
    pub reveal_order: Vec<CellId>,
    /// Cursor into `reveal_order`.
    pub reveal_index: usize,
    /// Admin-selected player for turn gating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player_id: Option<String>,
    /// Number of revealed cells.
    pub opened_count: u64,
}

impl GridMeta {
    /// Version-1 meta for a freshly seeded board.
    pub fn new(seed: i32, reveal_order: Vec<CellId>) -> Self {
        Self {
            version: 1,
            etag: make_etag(1),
            seed,
            reveal_order,
            reveal_index: 0,
            current_player_id: None,
            opened_count: 0,
        }
    }

    /// Monotonic change counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// `v-{version}`.
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Record one observable mutation.
    pub fn bump_version(&mut self) {
        self.version += 1;
        self.etag = make_etag(self.version);
    }

    /// Number this meta after `previous` so a replaced board never reuses
    /// an etag a client may still hold.
    pub(crate) fn continue_after(&mut self, previous: u64) {
        if previous >= self.version {
            self.version = previous + 1;
            self.etag = make_etag(self.version);
        }
    }

    /// Client-facing view (no reveal order).
    pub fn view(&self, total: usize) -> MetaView {
        MetaView {
            version: self.version,
            etag: self.etag.clone(),
            seed: self.seed,
            reveal_index: self.reveal_index,
            current_player_id: self.current_player_id.clone(),
            opened_count: self.opened_count,
            total,
        }
    }
}

/// Meta as returned from operations.
///
/// Leaves out `reveal_order` so callers cannot read the bot's future path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaView {
    /// Board version.
    pub version: u64,
    /// `v-{version}`.
    pub etag: String,
    /// Board seed.
    pub seed: i32,
    /// Bot cursor.
    pub reveal_index: usize,
    /// Turn marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player_id: Option<String>,
    /// Revealed cells.
    pub opened_count: u64,
    /// Cells on the board.
    pub total: usize,
}

/// Version pair used for staleness checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTag {
    /// Board version.
    pub version: u64,
    /// `v-{version}`.
    pub etag: String,
}

// =============================================================================
// STORED META (schema evolution)
// =============================================================================

/// Meta record from an older schema revision. Every field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMeta {
    /// Version, if recorded.
    #[serde(default)]
    pub version: Option<u64>,
    /// Seed, if recorded.
    #[serde(default)]
    pub seed: Option<i32>,
    /// Reveal order, if recorded.
    #[serde(default)]
    pub reveal_order: Option<Vec<CellId>>,
    /// Cursor, if recorded.
    #[serde(default)]
    pub reveal_index: Option<usize>,
    /// Turn marker, if recorded.
    #[serde(default)]
    pub current_player_id: Option<String>,
    /// Opened count, if recorded.
    #[serde(default)]
    pub opened_count: Option<u64>,
}

/// Meta exactly as found in the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredMeta {
    /// Current schema.
    Fresh(GridMeta),
    /// Older schema needing backfill.
    Legacy(LegacyMeta),
}

/// Result of bringing stored meta up to the current schema.
#[derive(Debug)]
pub struct NormalizedMeta {
    /// Meta in current form.
    pub meta: GridMeta,
    /// Anything had to be filled in (caller should persist).
    pub backfilled: bool,
}

impl StoredMeta {
    /// Normalize against the stored cells.
    ///
    /// Missing seed falls back to [`DEFAULT_SEED`]; a missing order or cursor
    /// regenerates the order for the board's dimensions and rewinds the
    /// cursor; a missing opened count is recounted from the cells.
    pub fn normalize(self, cells: &BTreeMap<CellId, Cell>) -> NormalizedMeta {
        match self {
            StoredMeta::Fresh(mut meta) => {
                let mut backfilled = false;
                let etag = make_etag(meta.version);
                if meta.etag != etag {
                    meta.etag = etag;
                    backfilled = true;
                }
                if meta.reveal_order.len() != cells.len() {
                    let (rows, cols) = dimensions(cells);
                    meta.reveal_order = reveal_order(rows, cols, meta.seed);
                    meta.reveal_index = 0;
                    backfilled = true;
                }
                NormalizedMeta { meta, backfilled }
            }
            StoredMeta::Legacy(legacy) => {
                let seed = legacy.seed.unwrap_or(DEFAULT_SEED);
                let version = legacy.version.unwrap_or(1).max(1);
                let (order, index) = match (legacy.reveal_order, legacy.reveal_index) {
                    (Some(order), Some(index)) if order.len() == cells.len() => (order, index),
                    _ => {
                        let (rows, cols) = dimensions(cells);
                        (reveal_order(rows, cols, seed), 0)
                    }
                };
                let opened = legacy
                    .opened_count
                    .unwrap_or_else(|| cells.values().filter(|c| c.revealed).count() as u64);
                let meta = GridMeta {
                    version,
                    etag: make_etag(version),
                    seed,
                    reveal_order: order,
                    reveal_index: index,
                    current_player_id: legacy.current_player_id,
                    opened_count: opened,
                };
                NormalizedMeta { meta, backfilled: true }
            }
        }
    }
}

/// `(rows, cols)` spanned by a cell map.
pub fn dimensions(cells: &BTreeMap<CellId, Cell>) -> (u32, u32) {
    let rows = cells.keys().map(|id| id.row + 1).max().unwrap_or(0);
    let cols = cells.keys().map(|id| id.col + 1).max().unwrap_or(0);
    (rows, cols)
}

// =============================================================================
// GRID STATE
// =============================================================================

/// Cells plus meta.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridState {
    /// Every cell, row-major.
    pub cells: BTreeMap<CellId, Cell>,
    /// Board metadata.
    pub meta: GridMeta,
}

impl GridState {
    /// Number of cells.
    pub fn total(&self) -> usize {
        self.cells.len()
    }

    /// Look up a cell by its wire id.
    pub fn cell(&self, id: &str) -> Option<&Cell> {
        CellId::parse(id).and_then(|id| self.cells.get(&id))
    }

    /// Revealed cells in row-major order.
    pub fn revealed(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values().filter(|c| c.revealed)
    }

    /// `(rows, cols)` of this board.
    pub fn dimensions(&self) -> (u32, u32) {
        dimensions(&self.cells)
    }
}

// =============================================================================
// TESTS
// =============================================================================

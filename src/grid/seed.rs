//! Grid Seeder
//!
//! Builds the unrevealed board, picks the hidden prize targets and the bot's
//! reveal order, all from one seed. Targets and order come from independent
//! streams, so neither can be inferred from the other.

use std::collections::BTreeMap;

use crate::core::rng::{SeedStream, DEFAULT_SEED};
use crate::grid::cell::{Cell, CellId, Prize, CONSOLATION_CAP};
use crate::grid::state::{GridMeta, GridState};

/// Hidden ground truth: prize-bearing cells only.
pub type Targets = BTreeMap<CellId, Prize>;

/// Fresh board plus its targets.
#[derive(Clone, Debug)]
pub struct SeedResult {
    /// Unrevealed board at version 1.
    pub state: GridState,
    /// Prize-bearing cells.
    pub targets: Targets,
}

/// All ids of a `rows x cols` board, row-major.
pub fn all_cell_ids(rows: u32, cols: u32) -> Vec<CellId> {
    let mut ids = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        for col in 0..cols {
            ids.push(CellId::new(row, col));
        }
    }
    ids
}

/// Seed the board.
///
/// Same `(rows, cols, seed)` always yields the same targets and reveal order.
/// A missing seed uses [`DEFAULT_SEED`].
pub fn seed_grid(rows: u32, cols: u32, seed: Option<i32>) -> SeedResult {
    let seed = seed.unwrap_or(DEFAULT_SEED);
    let ids = all_cell_ids(rows, cols);

    let cells: BTreeMap<CellId, Cell> = ids.iter().map(|&id| (id, Cell::new(id))).collect();
    let targets = place_targets(&ids, seed);

    let mut order = ids;
    SeedStream::RevealOrder.rng(seed).shuffle(&mut order);

    SeedResult {
        state: GridState {
            cells,
            meta: GridMeta::new(seed, order),
        },
        targets,
    }
}

/// Recompute only the targets for a board.
pub fn targets_for(rows: u32, cols: u32, seed: i32) -> Targets {
    place_targets(&all_cell_ids(rows, cols), seed)
}

/// Recompute only the reveal order for a board.
pub fn reveal_order(rows: u32, cols: u32, seed: i32) -> Vec<CellId> {
    let mut order = all_cell_ids(rows, cols);
    SeedStream::RevealOrder.rng(seed).shuffle(&mut order);
    order
}

/// First shuffled id is grand, the next up to [`CONSOLATION_CAP`] are consolation.
fn place_targets(ids: &[CellId], seed: i32) -> Targets {
    let mut shuffled = ids.to_vec();
    SeedStream::Placement.rng(seed).shuffle(&mut shuffled);

    let mut targets = Targets::new();
    let Some((&grand, rest)) = shuffled.split_first() else {
        return targets;
    };
    targets.insert(grand, Prize::GRAND);
    for &id in rest.iter().take(CONSOLATION_CAP) {
        targets.entry(id).or_insert(Prize::CONSOLATION);
    }
    targets
}

/// Next bot candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BotCandidate {
    /// Unrevealed cell to open, if any remain.
    pub id: Option<CellId>,
    /// Cursor to persist: one past the last inspected position.
    pub index: usize,
}

/// Scan `reveal_order` from the cursor for the first unrevealed cell.
///
/// Does not mutate; the caller stores `index` into `meta.reveal_index`.
pub fn next_bot_reveal(state: &GridState) -> BotCandidate {
    let order = &state.meta.reveal_order;
    let mut i = state.meta.reveal_index;
    while i < order.len() {
        let id = order[i];
        i += 1;
        let revealed = state.cells.get(&id).map(|c| c.revealed).unwrap_or(true);
        if !revealed {
            return BotCandidate { id: Some(id), index: i };
        }
    }
    BotCandidate { id: None, index: i.max(state.meta.reveal_index) }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::cell::PrizeKind;
    use proptest::prelude::*;

    fn count(targets: &Targets, kind: PrizeKind) -> usize {
        targets.values().filter(|p| p.kind == kind).count()
    }

    #[test]
    fn test_seed_grid_full_board() {
        let a = seed_grid(100, 100, Some(2025));
        let b = seed_grid(100, 100, Some(2025));

        assert_eq!(a.state.total(), 10_000);
        assert_eq!(a.state.meta.reveal_order[..10], b.state.meta.reveal_order[..10]);
        assert_eq!(a.state.meta.reveal_order, b.state.meta.reveal_order);
        assert_eq!(a.targets, b.targets);
        assert_eq!(count(&a.targets, PrizeKind::Grand), 1);
        assert_eq!(count(&a.targets, PrizeKind::Consolation), 100);
        assert_eq!(a.targets.len(), 101);
    }

    #[test]
    fn test_initial_meta() {
        let seeded = seed_grid(10, 10, Some(42));
        let meta = &seeded.state.meta;
        assert_eq!(meta.version(), 1);
        assert_eq!(meta.etag(), "v-1");
        assert_eq!(meta.seed, 42);
        assert_eq!(meta.reveal_index, 0);
        assert_eq!(meta.opened_count, 0);
        assert!(seeded.state.cells.values().all(|c| !c.revealed && c.prize.is_none()));
    }

    #[test]
    fn test_default_seed() {
        let implicit = seed_grid(5, 5, None);
        let explicit = seed_grid(5, 5, Some(DEFAULT_SEED));
        assert_eq!(implicit.targets, explicit.targets);
        assert_eq!(implicit.state.meta.seed, DEFAULT_SEED);
    }

    #[test]
    fn test_small_board_caps_consolation() {
        let seeded = seed_grid(3, 4, Some(9));
        assert_eq!(count(&seeded.targets, PrizeKind::Grand), 1);
        assert_eq!(count(&seeded.targets, PrizeKind::Consolation), 11);
    }

    #[test]
    fn test_single_cell_and_empty_board() {
        let one = seed_grid(1, 1, Some(3));
        assert_eq!(one.targets.len(), 1);
        assert_eq!(one.targets[&CellId::new(0, 0)], Prize::GRAND);

        let empty = seed_grid(0, 0, Some(3));
        assert!(empty.targets.is_empty());
        assert!(empty.state.meta.reveal_order.is_empty());
    }

    #[test]
    fn test_order_independent_of_placement() {
        let seeded = seed_grid(20, 20, Some(77));
        let mut placement = all_cell_ids(20, 20);
        SeedStream::Placement.rng(77).shuffle(&mut placement);
        assert_ne!(placement, seeded.state.meta.reveal_order);
    }

    #[test]
    fn test_recompute_helpers_match_seed_grid() {
        let seeded = seed_grid(12, 9, Some(-4));
        assert_eq!(targets_for(12, 9, -4), seeded.targets);
        assert_eq!(reveal_order(12, 9, -4), seeded.state.meta.reveal_order);
    }

    #[test]
    fn test_next_bot_reveal_skips_revealed() {
        let mut state = seed_grid(3, 3, Some(5)).state;
        let first = state.meta.reveal_order[0];
        let second = state.meta.reveal_order[1];
        state.cells.get_mut(&first).unwrap().revealed = true;

        let next = next_bot_reveal(&state);
        assert_eq!(next, BotCandidate { id: Some(second), index: 2 });
    }

    #[test]
    fn test_next_bot_reveal_exhausted() {
        let mut state = seed_grid(2, 2, Some(5)).state;
        for cell in state.cells.values_mut() {
            cell.revealed = true;
        }
        assert_eq!(next_bot_reveal(&state), BotCandidate { id: None, index: 4 });

        state.meta.reveal_index = 4;
        assert_eq!(next_bot_reveal(&state), BotCandidate { id: None, index: 4 });
    }

    proptest! {
        #[test]
        fn prop_seed_grid_is_deterministic(rows in 0u32..30, cols in 0u32..30, seed in any::<i32>()) {
            let a = seed_grid(rows, cols, Some(seed));
            let b = seed_grid(rows, cols, Some(seed));
            prop_assert_eq!(&a.targets, &b.targets);
            prop_assert_eq!(&a.state.meta.reveal_order, &b.state.meta.reveal_order);
        }

        #[test]
        fn prop_prize_cardinality(rows in 1u32..25, cols in 1u32..25, seed in any::<i32>()) {
            let seeded = seed_grid(rows, cols, Some(seed));
            let total = (rows * cols) as usize;
            prop_assert_eq!(count(&seeded.targets, PrizeKind::Grand), 1);
            prop_assert_eq!(count(&seeded.targets, PrizeKind::Consolation), CONSOLATION_CAP.min(total - 1));
            prop_assert!(seeded.targets.keys().all(|id| seeded.state.cells.contains_key(id)));
        }

        #[test]
        fn prop_reveal_order_is_permutation(rows in 0u32..20, cols in 0u32..20, seed in any::<i32>()) {
            let seeded = seed_grid(rows, cols, Some(seed));
            let mut order = seeded.state.meta.reveal_order.clone();
            order.sort();
            prop_assert_eq!(order, all_cell_ids(rows, cols));
        }
    }
}

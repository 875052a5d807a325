//! Grid Service
//!
//! The explicit state handle for one running instance. Operations run one
//! at a time behind the board mutex, so a reveal's check and its mutation
//! can never interleave with another call. The bot's simulated delay is the
//! only wait taken outside the lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::core::hash::StateHash;
use crate::engine::clock::{Clock, SystemClock};
use crate::engine::{GridConfig, GridError, ResetMode};
use crate::grid::{
    Board, BotDelayRange, BotError, BotStep, Cell, CellId, ClientSnapshot, EligibleUsersPage,
    MetaView, PickError, RevealError, RevealOptions, Revealed, SelectError, StoredMeta,
    TargetCell, UserRoster, UserSummary,
};
use crate::store::{Collection, Collections, KeyValueStore, StorageError};

/// How `boot` obtained the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootKind {
    /// Nothing stored; seeded and saved.
    Fresh,
    /// Loaded as stored.
    Loaded,
    /// Loaded, then older or missing parts were filled in and saved.
    Backfilled,
}

fn decode<T: DeserializeOwned>(collection: Collection, value: serde_json::Value) -> Result<T, GridError> {
    serde_json::from_value(value).map_err(|source| GridError::Corrupt { collection, source })
}

/// Grid State Store.
pub struct GridService<S: KeyValueStore> {
    config: GridConfig,
    store: S,
    board: Mutex<Option<Board>>,
    bot_delay: RwLock<BotDelayRange>,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> GridService<S> {
    /// Service over `store` using the wall clock.
    pub fn new(config: GridConfig, store: S) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Service with an explicit time source.
    pub fn with_clock(config: GridConfig, store: S, clock: Arc<dyn Clock>) -> Self {
        let bot_delay = RwLock::new(config.bot_delay);
        Self {
            config,
            store,
            board: Mutex::new(None),
            bot_delay,
            clock,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Load the stored board, or seed and save a fresh one.
    ///
    /// Calling it again against stored state reloads the same board; the
    /// version does not move.
    #[instrument(skip(self))]
    pub async fn boot(&self, seed: Option<i32>) -> Result<BootKind, GridError> {
        let mut guard = self.board.lock().await;
        let mut stored = self.store.read(&Collection::ALL).await?;

        let (board, kind) = match (stored.remove(&Collection::Grid), stored.remove(&Collection::Meta)) {
            (Some(grid), Some(meta)) => {
                let cells: BTreeMap<CellId, Cell> = decode(Collection::Grid, grid)?;
                let meta: StoredMeta = decode(Collection::Meta, meta)?;
                let users: Option<UserRoster> = stored
                    .remove(&Collection::Users)
                    .map(|users| decode(Collection::Users, users))
                    .transpose()?;

                let restored = Board::restore(cells, meta, users, self.config.user_count);
                let mut backfill = Vec::new();
                if restored.meta_backfilled {
                    backfill.push(Collection::Meta);
                }
                if restored.users_generated {
                    backfill.push(Collection::Users);
                }
                if backfill.is_empty() {
                    (restored.board, BootKind::Loaded)
                } else {
                    warn!(?backfill, "stored board needed backfill");
                    self.persist(&restored.board, &backfill).await?;
                    (restored.board, BootKind::Backfilled)
                }
            }
            _ => {
                let board = Board::generate(self.config.shape(), seed.or(self.config.default_seed));
                self.persist(&board, &Collection::ALL).await?;
                (board, BootKind::Fresh)
            }
        };

        info!(
            ?kind,
            seed = board.seed(),
            version = board.version(),
            cells = board.state().total(),
            users = board.users().len(),
            "grid booted"
        );
        *guard = Some(board);
        Ok(kind)
    }

    /// Throw away the board and regenerate everything from `seed`.
    ///
    /// The new board's version continues after the old one.
    #[instrument(skip(self))]
    pub async fn admin_reset(&self, mode: ResetMode, seed: Option<i32>) -> Result<MetaView, GridError> {
        let mut guard = self.board.lock().await;
        let mut board = Board::generate(self.config.shape(), seed.or(self.config.default_seed));
        if let Some(previous) = guard.as_ref() {
            board.state.meta.continue_after(previous.version());
        }
        self.persist(&board, &Collection::ALL).await?;

        info!(?mode, seed = board.seed(), version = board.version(), "grid reset");
        let meta = board.state.meta.view(board.state.total());
        *guard = Some(board);
        Ok(meta)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Run `f` against the live board.
    pub async fn inspect<R>(&self, f: impl FnOnce(&Board) -> R) -> Result<R, GridError> {
        let guard = self.board.lock().await;
        guard.as_ref().map(f).ok_or(GridError::NotBooted)
    }

    /// Client polling snapshot.
    pub async fn snapshot(&self) -> Result<ClientSnapshot, GridError> {
        self.inspect(Board::snapshot).await
    }

    /// Hidden targets. Admin only.
    pub async fn admin_targets(&self) -> Result<Vec<TargetCell>, GridError> {
        self.inspect(Board::admin_targets).await
    }

    /// Digest of the live board.
    pub async fn digest(&self) -> Result<StateHash, GridError> {
        self.inspect(Board::digest).await
    }

    /// Current player marker.
    pub async fn current_player(&self) -> Result<Option<String>, GridError> {
        self.inspect(|b| b.current_player().map(str::to_string)).await
    }

    /// Page of unplayed users.
    pub async fn list_eligible_users(
        &self,
        offset: usize,
        limit: usize,
        query: Option<&str>,
    ) -> Result<EligibleUsersPage, GridError> {
        self.inspect(|b| b.list_eligible_users(offset, limit, query)).await
    }

    /// Stable display identity for a client.
    pub async fn assign_user_for_client(&self, client_id: &str) -> Result<UserSummary, GridError> {
        self.inspect(|b| b.assign_user_for_client(client_id))
            .await?
            .ok_or(GridError::UsersNotInitialized)
    }

    /// Known ids with names. Empty before boot.
    pub async fn resolve_users(&self, ids: &[String]) -> Vec<UserSummary> {
        self.inspect(|b| b.resolve_users(ids)).await.unwrap_or_default()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Reveal a cell. Saved before returning on success.
    pub async fn reveal_cell(
        &self,
        id: &str,
        player_id: Option<&str>,
        options: &RevealOptions,
    ) -> Result<Result<Revealed, RevealError>, GridError> {
        let mut guard = self.board.lock().await;
        let board = guard.as_mut().ok_or(GridError::NotBooted)?;

        let before = board.clone();
        let outcome = board.reveal_cell(id, player_id, options, self.clock.now());
        match &outcome {
            Ok(revealed) => {
                self.commit_or_restore(board, before, &Collection::ALL).await?;
                debug!(
                    cell = %revealed.cell.id,
                    by = ?revealed.cell.revealed_by,
                    version = revealed.meta.version,
                    "cell revealed"
                );
            }
            Err(e) => debug!(id, player = ?player_id, code = e.code().as_str(), "reveal rejected"),
        }
        Ok(outcome)
    }

    /// One bot step, preceded by the simulated delay.
    pub async fn bot_step(&self) -> Result<Result<BotStep, BotError>, GridError> {
        let (seed, version) = {
            let guard = self.board.lock().await;
            match guard.as_ref() {
                Some(board) => (board.seed(), board.version()),
                None => return Ok(Err(BotError::NotBooted)),
            }
        };

        let delay = self.bot_delay.read().await.delay_for(seed, version);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut guard = self.board.lock().await;
        let Some(board) = guard.as_mut() else {
            return Ok(Err(BotError::NotBooted));
        };
        let before = board.clone();
        let step = board.bot_step(self.clock.now());
        self.commit_or_restore(board, before, &Collection::ALL).await?;

        debug!(
            revealed = ?step.revealed.as_ref().map(|c| c.id),
            index = step.meta.reveal_index,
            done = step.done,
            delay_ms = delay.as_millis() as u64,
            "bot step"
        );
        Ok(Ok(step))
    }

    /// Pick a random unplayed user as current player.
    pub async fn pick_random_eligible_user(&self) -> Result<Result<String, PickError>, GridError> {
        let mut guard = self.board.lock().await;
        let board = guard.as_mut().ok_or(GridError::NotBooted)?;

        let before = board.clone();
        let outcome = board.pick_random_eligible_user();
        if let Ok(player) = &outcome {
            self.commit_or_restore(board, before, &[Collection::Meta]).await?;
            info!(player = %player, "current player picked");
        }
        Ok(outcome)
    }

    /// Set or clear the current player.
    pub async fn set_current_player(&self, player_id: Option<&str>) -> Result<Result<(), SelectError>, GridError> {
        let mut guard = self.board.lock().await;
        let board = guard.as_mut().ok_or(GridError::NotBooted)?;

        let before = board.clone();
        let outcome = board.set_current_player(player_id);
        if outcome.is_ok() {
            self.commit_or_restore(board, before, &[Collection::Meta]).await?;
            info!(player = ?player_id, "current player set");
        }
        Ok(outcome)
    }

    /// Current bot delay window.
    pub async fn bot_delay_range(&self) -> BotDelayRange {
        *self.bot_delay.read().await
    }

    /// Replace the bot delay window. Values are clamped, never rejected.
    pub async fn set_bot_delay_range(&self, min_ms: i64, max_ms: i64) -> BotDelayRange {
        let range = BotDelayRange::new(min_ms, max_ms);
        *self.bot_delay.write().await = range;
        info!(min_ms = range.min_ms, max_ms = range.max_ms, "bot delay updated");
        range
    }

    /// Set the window directly (already valid). Returns the window it replaced.
    pub async fn replace_bot_delay_range(&self, range: BotDelayRange) -> BotDelayRange {
        let previous = std::mem::replace(&mut *self.bot_delay.write().await, range);
        if previous != range {
            info!(
                from_min_ms = previous.min_ms,
                from_max_ms = previous.max_ms,
                min_ms = range.min_ms,
                max_ms = range.max_ms,
                "bot delay replaced"
            );
        }
        previous
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    async fn persist(&self, board: &Board, collections: &[Collection]) -> Result<(), GridError> {
        let mut puts = Collections::new();
        for &collection in collections {
            let value = match collection {
                Collection::Grid => serde_json::to_value(&board.state.cells),
                Collection::Meta => serde_json::to_value(&board.state.meta),
                Collection::Users => serde_json::to_value(&board.users),
            }
            .map_err(StorageError::from)?;
            puts.insert(collection, value);
        }
        self.store.commit(puts).await?;
        debug!(?collections, version = board.version(), "state committed");
        Ok(())
    }

    /// Save, or put the board back the way it was if the save fails.
    async fn commit_or_restore(
        &self,
        board: &mut Board,
        before: Board,
        collections: &[Collection],
    ) -> Result<(), GridError> {
        if let Err(e) = self.persist(board, collections).await {
            *board = before;
            return Err(e);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

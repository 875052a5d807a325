//! Grid Domain
//!
//! Pure, synchronous board logic. Nothing in here does I/O or sleeps; the
//! engine layer wraps a [`Board`] with persistence and locking.

pub mod cell;
pub mod state;
pub mod seed;
pub mod users;
pub mod error;
pub mod board;
pub mod reveal;
pub mod bot;
pub mod players;

pub use cell::{Cell, CellId, ParseCellIdError, Prize, PrizeKind};
pub use state::{GridMeta, GridState, LegacyMeta, MetaView, StoredMeta, VersionTag};
pub use seed::{seed_grid, SeedResult, Targets};
pub use users::{generate_users, User, UserRoster, UserSummary};
pub use error::{BotError, ErrorCode, PickError, RevealError, SelectError};
pub use board::{Board, BoardShape, ClientSnapshot, RestoredBoard, TargetCell};
pub use reveal::{RevealOptions, Revealed, BOT_PLAYER_ID};
pub use bot::{BotDelayRange, BotStep};
pub use players::{EligibleUsersPage, DEFAULT_PAGE_LIMIT};

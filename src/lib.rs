//! # Reveal Grid Server
//!
//! A rows x cols grid hiding a fixed number of prizes. Players each get one
//! reveal; a bot walks a shuffled order of every cell. All randomness is
//! forked from one 32-bit seed, so a board, its roster and the bot's path
//! can be rebuilt exactly from the seed alone.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    REVEAL GRID SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - xorshift32 PRNG and seed streams          │
//! │  └── hash.rs     - State digests and document checksums      │
//! │                                                              │
//! │  grid/           - Board logic (deterministic)               │
//! │  ├── seed.rs     - Prize placement and reveal order          │
//! │  ├── users.rs    - Seeded user roster                        │
//! │  ├── state.rs    - Cells, meta and version tags              │
//! │  ├── reveal.rs   - Reveal validation                         │
//! │  ├── bot.rs      - Bot stepping and delay window             │
//! │  └── players.rs  - Current player and user directory         │
//! │                                                              │
//! │  store/          - Collection persistence (memory, file)     │
//! │  engine/         - Serialized access and write-through       │
//! │  network/        - JSON over WebSocket                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! `core/` and `grid/` never read the clock or a global RNG: timestamps
//! are passed in and every random draw comes from a
//! [`SeedStream`](crate::core::rng::SeedStream). BTreeMap is used wherever
//! iteration order reaches the output.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod grid;
pub mod store;
pub mod engine;
pub mod network;

// Re-export commonly used types
pub use core::rng::{DeterministicRng, SeedStream};
pub use grid::{Board, BoardShape, Cell, CellId, GridState, MetaView, Prize, RevealOptions, UserRoster};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use engine::{BotDriver, GridConfig, GridError, GridService, ResetMode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

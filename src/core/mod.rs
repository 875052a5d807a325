//! Core deterministic primitives.
//!
//! Everything random on the board is forked from one seed through
//! [`rng::SeedStream`], so any board can be rebuilt bit-for-bit.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::{DeterministicRng, SeedStream, derive_seed, shuffle_in_place, DEFAULT_SEED};
pub use hash::{StateHash, StateHasher, document_checksum};

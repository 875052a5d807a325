//! State Hashing for Verification
//!
//! Provides deterministic hashing of board state for:
//! - Integrity checks on persisted store documents
//! - Comparing in-memory boards across reloads

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for board state.
///
/// Wraps SHA-256 with helpers for the primitive types the board uses.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a board (cells, meta, users).
    pub fn for_board() -> Self {
        Self::new(b"REVEAL_GRID_BOARD_V1")
    }

    /// Create hasher for a persisted store document.
    pub fn for_store_document() -> Self {
        Self::new(b"REVEAL_GRID_STORE_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with a length-prefixed string.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u64(value.len() as u64);
        self.hasher.update(value.as_bytes());
    }

    /// Update with an optional string; `None` and `Some("")` hash differently.
    #[inline]
    pub fn update_opt_str(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.update_u8(1);
                self.update_str(s);
            }
            None => self.update_u8(0),
        }
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute hash with domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// Hex checksum of a store document body.
pub fn document_checksum(body: &[u8]) -> String {
    let mut hasher = StateHasher::for_store_document();
    hasher.update_bytes(body);
    hex::encode(hasher.finalize())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_board();
            hasher.update_u32(100);
            hasher.update_u64(12345);
            hasher.update_str("r0-c0");
            hasher.update_bool(true);
            hasher.update_opt_str(Some("u00001"));
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_optional_string_encoding() {
        let none = {
            let mut h = StateHasher::new(b"test");
            h.update_opt_str(None);
            h.finalize()
        };
        let empty = {
            let mut h = StateHasher::new(b"test");
            h.update_opt_str(Some(""));
            h.finalize()
        };
        assert_ne!(none, empty);
    }

    #[test]
    fn test_domain_separation() {
        let data = [1u8, 2, 3, 4];

        let hash1 = hash_with_domain(b"DOMAIN_A", &data);
        let hash2 = hash_with_domain(b"DOMAIN_B", &data);

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_document_checksum() {
        let a = document_checksum(b"{\"grid\":{}}");
        assert_eq!(a.len(), 64);
        assert_eq!(a, document_checksum(b"{\"grid\":{}}"));
        assert_ne!(a, document_checksum(b"{\"grid\":[]}"));
    }
}

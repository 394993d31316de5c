//! # Named Registries
//!
//! Name ↔ id maps with insertion-order iteration and id recycling.
//!
//! ## Layout
//!
//! ```text
//!  buckets            entries (slot = id)
//!  ┌────┐            ┌──────────────────────────────────────────┐
//!  │ 0  │──► id 4 ──►│ id │ name │ hash prev/next │ order prev/next│
//!  │ 1  │──► NIL     └──────────────────────────────────────────┘
//!  │ .. │
//!  └────┘   order head ──► oldest live entry ──► ... ──► order tail
//! ```
//!
//! Every link is a plain slot index with [`NIL`](crate::NIL) meaning "no
//! link"; slot 0 holds data like any other. Each name hashes to one bucket
//! and appears in exactly one chain. The order list threads live entries in
//! insertion order, independent of which ids were recycled.
//!
//! Two variants share the chain algorithms:
//!
//! - [`NamedRegistry`]: contiguous arrays, one owner.
//! - [`NamedBuffer`]: triple-buffered, one writer and one reader.

pub mod named_buffer;
pub mod named_registry;

mod chain;

pub use named_buffer::{NameBuffer, NamedBuffer, NamedBufferReader, NamedBufferWriter};
pub use named_registry::NamedRegistry;

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::NIL;

const HASH_KEY_0: u64 = 0x7472_6964_656e_7400;
const HASH_KEY_1: u64 = 0x6e61_6d65_7370_6163;

/// Bucket a name falls into. Always in `0..hash_size`.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn bucket_of(name: &str, hash_size: usize) -> usize {
    let mut hasher = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
    hasher.write(name.as_bytes());
    let hash = hasher.finish() as i64;
    hash.rem_euclid(hash_size as i64) as usize
}

/// One slot of the entry table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NameEntry {
    /// Slot index when live, `NIL` when free.
    pub id: usize,
    pub name: String,
    pub hash_prev: usize,
    pub hash_next: usize,
    pub order_prev: usize,
    pub order_next: usize,
}

impl NameEntry {
    #[inline]
    pub fn is_live(&self) -> bool {
        self.id != NIL
    }
}

impl Default for NameEntry {
    fn default() -> Self {
        Self {
            id: NIL,
            name: String::new(),
            hash_prev: NIL,
            hash_next: NIL,
            order_prev: NIL,
            order_next: NIL,
        }
    }
}

/// Published list header: what a reader needs besides the tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ListHeader {
    pub count: usize,
    pub order_head: usize,
    pub capacity: usize,
}

impl ListHeader {
    pub const fn empty(capacity: usize) -> Self {
        Self {
            count: 0,
            order_head: NIL,
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_is_stable_and_in_range() {
        for size in [1, 2, 13, 47, 1024] {
            for name in ["", "a", "player", "entity/42", "ünïcödé"] {
                let bucket = bucket_of(name, size);
                assert!(bucket < size);
                assert_eq!(bucket, bucket_of(name, size));
            }
        }
    }

    #[test]
    fn test_default_entry_is_free() {
        let entry = NameEntry::default();
        assert!(!entry.is_live());
        assert_eq!(entry.hash_next, NIL);
        assert_eq!(entry.order_prev, NIL);
    }
}

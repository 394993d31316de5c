//! # Complete Binary Search Trees
//!
//! Ordered maps keyed by `i64`, embedded in an array with no child pointers:
//! the children of index `i` are `2i + 1` (smaller keys) and `2i + 2`
//! (larger keys).
//!
//! ## Invariants
//!
//! After every insert and remove:
//!
//! 1. **Order**: every left subtree holds smaller keys, every right subtree
//!    larger keys.
//! 2. **Completeness**: the occupied indices are exactly `0..count`.
//!
//! Insert always fills index `count`; remove always vacates `count - 1`. The
//! entries between the affected key's sorted position and that slot shift
//! one step along the in-order (walk) sequence, see [`walk`].
//!
//! ## Variants
//!
//! - [`CompleteBinarySearchTree`]: paged array, one owner.
//! - [`BufferedBinarySearchTree`]: triple-buffered, one writer and one reader.

pub mod buffered;
pub mod complete;
pub mod walk;

mod algo;

pub use buffered::{BufferedBinarySearchTree, TreeReader, TreeWriter};
pub use complete::CompleteBinarySearchTree;

use crate::NIL;

/// One array slot of a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry<V> {
    /// The slot this entry occupies, or [`NIL`] for an empty slot.
    pub index: usize,
    /// Ordering key.
    pub key: i64,
    /// Payload.
    pub value: V,
}

impl<V> TreeEntry<V> {
    /// Whether the slot holds no entry.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index == NIL
    }
}

impl<V: Default> Default for TreeEntry<V> {
    fn default() -> Self {
        Self {
            index: NIL,
            key: 0,
            value: V::default(),
        }
    }
}

/// Occupancy bookkeeping of a tree.
///
/// Because trees stay complete, `top == count - 1` and `top_continuous ==
/// top` at all times; both are kept for callers that size frames from them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeShape {
    /// Number of entries.
    pub count: usize,
    /// Highest occupied index, [`NIL`] when empty.
    pub top: usize,
    /// End of the occupied run starting at 0, [`NIL`] when empty.
    pub top_continuous: usize,
    /// Deepest layer holding an entry.
    pub top_layer: u32,
    /// First index of `top_layer`.
    pub top_layer_index: usize,
}

impl TreeShape {
    /// Shape of an empty tree.
    pub const EMPTY: Self = Self {
        count: 0,
        top: NIL,
        top_continuous: NIL,
        top_layer: 0,
        top_layer_index: 0,
    };

    /// Accounts for one entry appended at index `count`.
    pub fn grow(&mut self) {
        self.count += 1;
        self.top = self.count - 1;
        self.top_continuous = self.top;
        if self.top > 0 && self.top >= 2 * self.top_layer_index + 1 {
            self.top_layer += 1;
            self.top_layer_index = 2 * self.top_layer_index + 1;
        }
    }

    /// Accounts for the entry at index `count - 1` going away.
    pub fn shrink(&mut self) {
        if self.count <= 1 {
            *self = Self::EMPTY;
            return;
        }
        self.count -= 1;
        self.top = self.count - 1;
        self.top_continuous = self.top;
        if self.top < self.top_layer_index {
            self.top_layer -= 1;
            self.top_layer_index = (self.top_layer_index - 1) / 2;
        }
    }

    /// Depth of the frame spanning every occupied index.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.top_layer
    }
}

impl Default for TreeShape {
    fn default() -> Self {
        Self::EMPTY
    }
}

//! # Complete Binary Search Tree
//!
//! Single-owner ordered map over a paged array.

use crate::buffer::PagedArray;
use crate::config::StorageConfig;
use crate::tree::algo::{self, TreeStore, TreeView};
use crate::tree::{TreeEntry, TreeShape};

/// Array-embedded ordered map that stays complete.
///
/// Lookups descend from the root in `O(log n)`. Inserts and removes keep
/// every slot below `len()` occupied by shifting entries along the in-order
/// sequence.
///
/// ## Usage
///
/// ```rust
/// use trident_core::CompleteBinarySearchTree;
///
/// let mut tree: CompleteBinarySearchTree<&str> = CompleteBinarySearchTree::new(8, 1);
/// tree.add(20, "b");
/// tree.add(10, "a");
/// tree.add(30, "c");
///
/// assert_eq!(tree.get(10), Some(&"a"));
/// assert_eq!(tree.keys().collect::<Vec<_>>(), [10, 20, 30]);
/// ```
#[derive(Clone, Debug)]
pub struct CompleteBinarySearchTree<V> {
    entries: PagedArray<TreeEntry<V>>,
    shape: TreeShape,
}

impl<V: Clone + Default> CompleteBinarySearchTree<V> {
    /// Creates an empty tree.
    ///
    /// # Arguments
    ///
    /// * `page_power` - Page size of the backing array as a power of two
    /// * `initial_page_count` - Page-table slots reserved up front
    #[must_use]
    pub fn new(page_power: u32, initial_page_count: usize) -> Self {
        Self {
            entries: PagedArray::new(page_power, initial_page_count),
            shape: TreeShape::EMPTY,
        }
    }

    /// Creates an empty tree sized by `config`.
    #[must_use]
    pub fn with_config(config: &StorageConfig) -> Self {
        Self::new(config.page_power, config.initial_page_count)
    }

    /// Entry holding `key`.
    #[must_use]
    pub fn find(&self, key: i64) -> Option<&TreeEntry<V>> {
        algo::find(self, key)
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: i64) -> Option<&V> {
        self.find(key).map(|entry| &entry.value)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: i64) -> bool {
        self.find(key).is_some()
    }

    /// Inserts `key`. Returns `false` without touching the tree if the key
    /// is already present.
    pub fn add(&mut self, key: i64, value: V) -> bool {
        algo::insert(self, key, value)
    }

    /// Inserts `key` or replaces its value.
    pub fn set(&mut self, key: i64, value: V) {
        algo::upsert(self, key, value);
    }

    /// Removes `key` and returns its value.
    pub fn remove(&mut self, key: i64) -> Option<V> {
        algo::remove(self, key)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        algo::clear(self);
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry<V>> + '_ {
        algo::iter(self)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.iter().map(|entry| entry.key)
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.count
    }

    /// Whether the tree holds no entry.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.count == 0
    }

    /// Occupancy bookkeeping.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> TreeShape {
        self.shape
    }
}

impl<V: Clone + Default> Default for CompleteBinarySearchTree<V> {
    fn default() -> Self {
        Self::with_config(&StorageConfig::default())
    }
}

impl<V: Clone + Default> TreeView for CompleteBinarySearchTree<V> {
    type Value = V;

    fn shape(&self) -> TreeShape {
        self.shape
    }

    fn slot(&self, index: usize) -> Option<&TreeEntry<V>> {
        self.entries.get_ref(index)
    }
}

impl<V: Clone + Default> TreeStore for CompleteBinarySearchTree<V> {
    fn set_shape(&mut self, shape: TreeShape) {
        self.shape = shape;
    }

    fn put(&mut self, index: usize, entry: TreeEntry<V>) {
        self.entries.set(index, entry);
    }

    fn take(&mut self, index: usize) -> TreeEntry<V> {
        self.entries
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

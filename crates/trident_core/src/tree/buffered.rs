//! # Buffered Binary Search Tree
//!
//! A complete binary search tree whose slots live in a [`TripleBuffer`] and
//! whose [`TreeShape`] lives in a [`ValueBuffer`]. The writer inserts and
//! removes against copy 0; the reader walks its snapshot, which changes only
//! on `commit_read`.
//!
//! Vacated slots are overwritten with an empty entry rather than left stale,
//! so the reader's snapshot satisfies both tree invariants after every
//! publish. Both halves share a commit gate: slots and shape of one writer
//! commit reach the reader together or not at all.

use crate::buffer::{
    BufferReader, BufferWriter, CommitGate, CommitRead, CommitWrite, TransactionMode,
    TripleBuffer, ValueBuffer, ValueReader, ValueWriter,
};
use crate::config::StorageConfig;
use crate::tree::algo::{self, TreeStore, TreeView};
use crate::tree::{TreeEntry, TreeShape};

/// Writer half of a [`BufferedBinarySearchTree`].
pub struct TreeWriter<V> {
    entries: BufferWriter<TreeEntry<V>>,
    shape: ValueWriter<TreeShape>,
    gate: CommitGate,
}

/// Reader half of a [`BufferedBinarySearchTree`].
pub struct TreeReader<V> {
    entries: BufferReader<TreeEntry<V>>,
    shape: ValueReader<TreeShape>,
    gate: CommitGate,
}

/// Triple-buffered complete binary search tree.
///
/// ## Usage
///
/// ```rust
/// use trident_core::{BufferedBinarySearchTree, TransactionMode::{ReadOnly, WriteRead}};
///
/// let mut index: BufferedBinarySearchTree<u32> = BufferedBinarySearchTree::new(8, 1);
/// index.add(WriteRead, 7, 70);
/// assert!(!index.contains(ReadOnly, 7));
///
/// index.commit_write();
/// index.commit_read();
/// assert_eq!(index.get(ReadOnly, 7), Some(&70));
/// ```
pub struct BufferedBinarySearchTree<V> {
    writer: TreeWriter<V>,
    reader: TreeReader<V>,
}

// Lookups shared by both halves.
macro_rules! tree_reads {
    ($half:ident) => {
        impl<V: Clone + Default> $half<V> {
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

            /// Entries in ascending key order.
            pub fn iter(&self) -> impl Iterator<Item = &TreeEntry<V>> + '_ {
                algo::iter(self)
            }

            /// Keys in ascending order.
            pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
                self.iter().map(|entry| entry.key)
            }

            /// Number of entries.
            #[must_use]
            pub fn len(&self) -> usize {
                self.shape.get().count
            }

            /// Whether the tree holds no entry.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Occupancy bookkeeping.
            #[must_use]
            pub fn shape(&self) -> TreeShape {
                *self.shape.get()
            }
        }

        impl<V: Clone + Default> TreeView for $half<V> {
            type Value = V;

            fn shape(&self) -> TreeShape {
                *self.shape.get()
            }

            fn slot(&self, index: usize) -> Option<&TreeEntry<V>> {
                self.entries.get_ref(index)
            }
        }
    };
}

tree_reads!(TreeWriter);
tree_reads!(TreeReader);

// =============================================================================
// WRITER
// =============================================================================

impl<V: Clone + Default> TreeWriter<V> {
    /// Inserts `key`; `false` if it is already present.
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

    /// Publishes pending slot and shape changes to the middle copy.
    ///
    /// Returns the number of items transferred.
    pub fn commit_write(&mut self) -> usize {
        let _frame = self.gate.enter();
        self.entries.commit_write() + self.shape.commit_write()
    }

    /// Number of slots waiting for `commit_write`.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.entries.pending_writes()
    }
}

impl<V: Clone + Default> TreeStore for TreeWriter<V> {
    fn set_shape(&mut self, shape: TreeShape) {
        self.shape.set(shape);
    }

    fn put(&mut self, index: usize, entry: TreeEntry<V>) {
        self.entries.set(index, entry);
    }

    fn take(&mut self, index: usize) -> TreeEntry<V> {
        let entry = self.entries.get(index);
        self.entries.set(index, TreeEntry::default());
        entry
    }
}

impl<V: Clone + Default> CommitWrite for TreeWriter<V> {
    fn commit_write(&mut self) -> usize {
        TreeWriter::commit_write(self)
    }
}

// =============================================================================
// READER
// =============================================================================

impl<V: Clone + Default> TreeReader<V> {
    /// Pulls the last published slots and shape into the snapshot.
    ///
    /// Returns the number of items transferred.
    pub fn commit_read(&mut self) -> usize {
        let _frame = self.gate.enter();
        self.entries.commit_read() + self.shape.commit_read()
    }

    /// Number of slots waiting for `commit_read`.
    #[must_use]
    pub fn pending_reads(&self) -> usize {
        self.entries.pending_reads()
    }
}

impl<V: Clone + Default> CommitRead for TreeReader<V> {
    fn commit_read(&mut self) -> usize {
        TreeReader::commit_read(self)
    }
}

// =============================================================================
// PAIR
// =============================================================================

impl<V: Clone + Default> BufferedBinarySearchTree<V> {
    /// Creates an empty tree.
    ///
    /// # Arguments
    ///
    /// * `page_power` - Page size of each slot copy as a power of two
    /// * `initial_page_count` - Page-table slots reserved up front
    #[must_use]
    pub fn new(page_power: u32, initial_page_count: usize) -> Self {
        Self::with_config(&StorageConfig {
            page_power,
            initial_page_count,
            ..StorageConfig::default()
        })
    }

    /// Creates an empty tree sized by `config`.
    #[must_use]
    pub fn with_config(config: &StorageConfig) -> Self {
        let (entries_w, entries_r) = TripleBuffer::with_config(config).split();
        let (shape_w, shape_r) = ValueBuffer::new(TreeShape::EMPTY).split();
        let gate = CommitGate::default();
        Self {
            writer: TreeWriter {
                entries: entries_w,
                shape: shape_w,
                gate: gate.clone(),
            },
            reader: TreeReader {
                entries: entries_r,
                shape: shape_r,
                gate,
            },
        }
    }

    /// Separates the writer and reader halves.
    #[must_use]
    pub fn split(self) -> (TreeWriter<V>, TreeReader<V>) {
        (self.writer, self.reader)
    }

    /// Writer half.
    #[must_use]
    pub fn writer(&self) -> &TreeWriter<V> {
        &self.writer
    }

    /// Reader half.
    #[must_use]
    pub fn reader(&self) -> &TreeReader<V> {
        &self.reader
    }

    /// Entry holding `key` in the copy `mode` addresses.
    #[must_use]
    pub fn find(&self, mode: TransactionMode, key: i64) -> Option<&TreeEntry<V>> {
        match mode {
            TransactionMode::WriteRead => self.writer.find(key),
            TransactionMode::ReadOnly => self.reader.find(key),
        }
    }

    /// Value stored under `key` in the copy `mode` addresses.
    #[must_use]
    pub fn get(&self, mode: TransactionMode, key: i64) -> Option<&V> {
        self.find(mode, key).map(|entry| &entry.value)
    }

    /// Whether `key` is present in the copy `mode` addresses.
    #[must_use]
    pub fn contains(&self, mode: TransactionMode, key: i64) -> bool {
        self.find(mode, key).is_some()
    }

    /// Inserts `key`; `false` if present or under `ReadOnly`.
    pub fn add(&mut self, mode: TransactionMode, key: i64, value: V) -> bool {
        mode.is_writable() && self.writer.add(key, value)
    }

    /// Inserts `key` or replaces its value; ignored under `ReadOnly`.
    pub fn set(&mut self, mode: TransactionMode, key: i64, value: V) {
        if mode.is_writable() {
            self.writer.set(key, value);
        }
    }

    /// Removes `key`; `None` if absent or under `ReadOnly`.
    pub fn remove(&mut self, mode: TransactionMode, key: i64) -> Option<V> {
        if mode.is_writable() {
            self.writer.remove(key)
        } else {
            None
        }
    }

    /// Removes every entry; ignored under `ReadOnly`.
    pub fn clear(&mut self, mode: TransactionMode) {
        if mode.is_writable() {
            self.writer.clear();
        }
    }

    /// Entries of the copy `mode` addresses in ascending key order.
    pub fn iter(&self, mode: TransactionMode) -> Box<dyn Iterator<Item = &TreeEntry<V>> + '_> {
        match mode {
            TransactionMode::WriteRead => Box::new(self.writer.iter()),
            TransactionMode::ReadOnly => Box::new(self.reader.iter()),
        }
    }

    /// Keys of the copy `mode` addresses in ascending order.
    pub fn keys(&self, mode: TransactionMode) -> impl Iterator<Item = i64> + '_ {
        self.iter(mode).map(|entry| entry.key)
    }

    /// Number of entries in the copy `mode` addresses.
    #[must_use]
    pub fn len(&self, mode: TransactionMode) -> usize {
        self.shape(mode).count
    }

    /// Whether the copy `mode` addresses holds no entry.
    #[must_use]
    pub fn is_empty(&self, mode: TransactionMode) -> bool {
        self.len(mode) == 0
    }

    /// Occupancy bookkeeping of the copy `mode` addresses.
    #[must_use]
    pub fn shape(&self, mode: TransactionMode) -> TreeShape {
        match mode {
            TransactionMode::WriteRead => self.writer.shape(),
            TransactionMode::ReadOnly => self.reader.shape(),
        }
    }

    /// See [`TreeWriter::commit_write`].
    pub fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }

    /// See [`TreeReader::commit_read`].
    pub fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }
}

impl<V: Clone + Default> Default for BufferedBinarySearchTree<V> {
    fn default() -> Self {
        Self::with_config(&StorageConfig::default())
    }
}

impl<V: Clone + Default> CommitWrite for BufferedBinarySearchTree<V> {
    fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }
}

impl<V: Clone + Default> CommitRead for BufferedBinarySearchTree<V> {
    fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TransactionMode::{ReadOnly, WriteRead};
    use crate::tree::algo::assert_invariants;

    fn publish<V: Clone + Default>(tree: &mut BufferedBinarySearchTree<V>) {
        tree.commit_write();
        tree.commit_read();
    }

    #[test]
    fn test_inserts_visible_after_both_commits() {
        let mut tree: BufferedBinarySearchTree<i64> = BufferedBinarySearchTree::new(2, 1);
        for key in [5, 3, 8, 1] {
            assert!(tree.add(WriteRead, key, key * 100));
        }
        assert!(tree.is_empty(ReadOnly));
        tree.commit_write();
        assert!(tree.is_empty(ReadOnly));
        tree.commit_read();

        assert_eq!(tree.len(ReadOnly), 4);
        assert_eq!(tree.get(ReadOnly, 8), Some(&800));
        assert_eq!(tree.keys(ReadOnly).collect::<Vec<_>>(), [1, 3, 5, 8]);
        assert_invariants(tree.reader());
    }

    #[test]
    fn test_read_only_mutations_are_ignored() {
        let mut tree: BufferedBinarySearchTree<i64> = BufferedBinarySearchTree::new(2, 1);
        assert!(!tree.add(ReadOnly, 1, 1));
        tree.set(ReadOnly, 2, 2);
        tree.add(WriteRead, 3, 3);
        publish(&mut tree);

        assert_eq!(tree.remove(ReadOnly, 3), None);
        tree.clear(ReadOnly);
        assert_eq!(tree.len(WriteRead), 1);
        assert_eq!(tree.len(ReadOnly), 1);
        assert!(tree.contains(WriteRead, 3));
    }

    #[test]
    fn test_snapshot_holds_until_next_publish() {
        let mut tree: BufferedBinarySearchTree<i64> = BufferedBinarySearchTree::new(2, 1);
        for key in 0..12 {
            tree.add(WriteRead, key, key);
        }
        publish(&mut tree);

        for key in (0..12).step_by(3) {
            assert_eq!(tree.remove(WriteRead, key), Some(key));
        }
        tree.set(WriteRead, 4, 44);
        assert_eq!(tree.len(ReadOnly), 12);
        assert_eq!(tree.get(ReadOnly, 4), Some(&4));
        assert_invariants(tree.writer());
        assert_invariants(tree.reader());

        publish(&mut tree);
        assert_eq!(tree.keys(ReadOnly).collect::<Vec<_>>(), [1, 2, 4, 5, 7, 8, 10, 11]);
        assert_eq!(tree.get(ReadOnly, 4), Some(&44));
        assert_invariants(tree.reader());
    }

    #[test]
    fn test_clear_publishes_empty_slots() {
        let mut tree: BufferedBinarySearchTree<u8> = BufferedBinarySearchTree::new(2, 1);
        for key in 0..6 {
            tree.add(WriteRead, key, 1);
        }
        publish(&mut tree);
        tree.clear(WriteRead);
        publish(&mut tree);

        assert!(tree.is_empty(ReadOnly));
        assert_eq!(tree.shape(ReadOnly), TreeShape::EMPTY);
        assert_eq!(tree.iter(ReadOnly).count(), 0);
        assert!(tree.reader().find(0).is_none());
    }

    #[test]
    fn test_commit_counts() {
        let mut tree: BufferedBinarySearchTree<u8> = BufferedBinarySearchTree::new(4, 1);
        assert_eq!(tree.commit_write(), 0);
        tree.add(WriteRead, 10, 1);
        assert_eq!(tree.writer().pending_writes(), 1);
        // One slot plus the shape.
        assert_eq!(tree.commit_write(), 2);
        assert_eq!(tree.reader().pending_reads(), 1);
        assert_eq!(tree.commit_read(), 2);
        assert_eq!(tree.commit_read(), 0);
    }
}

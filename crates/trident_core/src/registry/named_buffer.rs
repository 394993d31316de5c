//! # Named Buffer
//!
//! Triple-buffered name ↔ id map: the writer thread registers, renames and
//! removes names; the reader thread sees a consistent snapshot of all of it
//! after `commit_write` then `commit_read`.
//!
//! ## Published vs. writer-only state
//!
//! | State                    | Storage                         |
//! |--------------------------|---------------------------------|
//! | values + entries         | `DualTripleBuffer` (paged)      |
//! | bucket heads             | `TripleBuffer` (flat)           |
//! | count, order head, cap.  | `ValueBuffer<ListHeader>`       |
//! | bucket tails, order tail | writer only                     |
//! | free ids, top            | writer only                     |
//!
//! The reader only walks chains forward from their heads, so tails and the
//! allocator never need publishing. The three published parts commit under
//! one gate shared by both halves, so a reader never pairs heads from one
//! frame with entries from another.

use crate::buffer::{
    BufferReader, BufferWriter, CommitGate, CommitRead, CommitWrite, DualBufferReader,
    DualBufferWriter, DualTripleBuffer, FlatArray, TransactionMode, TripleBuffer, ValueBuffer,
    ValueReader, ValueWriter,
};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::registry::chain::{self, IdAllocator, RegistryStore, RegistryView};
use crate::registry::{ListHeader, NameEntry};
use crate::NIL;

/// Writer half of a [`NamedBuffer`].
pub struct NamedBufferWriter<V> {
    entries: DualBufferWriter<V, NameEntry>,
    bucket_heads: BufferWriter<usize, FlatArray<usize>>,
    bucket_tails: Vec<usize>,
    order_tail: usize,
    header: ValueWriter<ListHeader>,
    ids: IdAllocator,
    gate: CommitGate,
}

/// Reader half of a [`NamedBuffer`].
pub struct NamedBufferReader<V> {
    entries: DualBufferReader<V, NameEntry>,
    bucket_heads: BufferReader<usize, FlatArray<usize>>,
    header: ValueReader<ListHeader>,
    hash_size: usize,
    gate: CommitGate,
}

/// Triple-buffered, hash-indexed, insertion-ordered registry.
///
/// Every call takes a [`TransactionMode`]. `WriteRead` reads and mutates the
/// writer's copy; `ReadOnly` reads the reader's snapshot and turns mutations
/// into no-ops.
///
/// ## Usage
///
/// ```rust
/// use trident_core::{NamedBuffer, TransactionMode::{ReadOnly, WriteRead}};
///
/// let mut components: NamedBuffer<u16> = NamedBuffer::new(64, 47);
/// let id = components.add(WriteRead, "transform", 12).unwrap();
/// assert!(!components.contains_name(ReadOnly, "transform"));
///
/// components.commit_write();
/// components.commit_read();
/// assert_eq!(components.id_of(ReadOnly, "transform"), Some(id));
/// ```
pub struct NamedBuffer<V> {
    writer: NamedBufferWriter<V>,
    reader: NamedBufferReader<V>,
}

/// Name-only registry: ids for names, nothing else.
pub type NameBuffer = NamedBuffer<()>;

// Read surface shared by both halves.
macro_rules! registry_reads {
    ($half:ident) => {
        impl<V: Clone + Default> $half<V> {
            /// Value of a live id.
            ///
            /// # Errors
            ///
            /// [`StorageError::IdOutOfRange`] if `id >= capacity`,
            /// [`StorageError::IdNotFound`] if the id is not live.
            pub fn get(&self, id: usize) -> StorageResult<&V> {
                chain::value_of(self, id)
            }

            /// Value of a live name.
            ///
            /// # Errors
            ///
            /// [`StorageError::NameNotFound`] if no entry has this name.
            pub fn get_by_name(&self, name: &str) -> StorageResult<&V> {
                self.id_of(name)
                    .and_then(|id| RegistryView::value(self, id))
                    .ok_or_else(|| StorageError::NameNotFound(name.to_owned()))
            }

            /// Value of a live id, if any.
            #[must_use]
            pub fn try_get(&self, id: usize) -> Option<&V> {
                self.get(id).ok()
            }

            /// Value of a live name, if any.
            #[must_use]
            pub fn try_get_by_name(&self, name: &str) -> Option<&V> {
                self.get_by_name(name).ok()
            }

            /// Whether `id` is live.
            #[must_use]
            pub fn contains_id(&self, id: usize) -> bool {
                chain::is_live(self, id)
            }

            /// Whether some entry has `name`.
            #[must_use]
            pub fn contains_name(&self, name: &str) -> bool {
                self.id_of(name).is_some()
            }

            /// Id of `name`, if live.
            #[must_use]
            pub fn id_of(&self, name: &str) -> Option<usize> {
                chain::find_name(self, name)
            }

            /// Name of a live id.
            ///
            /// # Errors
            ///
            /// Same as [`get`](Self::get).
            pub fn name_of(&self, id: usize) -> StorageResult<&str> {
                chain::live_entry(self, id).map(|entry| entry.name.as_str())
            }

            /// Live entries as `(id, name, value)` in insertion order.
            pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &V)> + '_ {
                chain::iter(self)
            }

            /// Number of live entries.
            #[must_use]
            pub fn len(&self) -> usize {
                RegistryView::header(self).count
            }

            /// Whether no entry is live.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Id capacity.
            #[must_use]
            pub fn capacity(&self) -> usize {
                RegistryView::header(self).capacity
            }

            /// Number of hash buckets.
            #[must_use]
            pub fn hash_size(&self) -> usize {
                RegistryView::hash_size(self)
            }
        }

        impl<V: Clone + Default + PartialEq> $half<V> {
            /// Whether some live entry holds `value`.
            #[must_use]
            pub fn contains_value(&self, value: &V) -> bool {
                self.id_of_value(value).is_some()
            }

            /// Id of the oldest live entry holding `value`.
            #[must_use]
            pub fn id_of_value(&self, value: &V) -> Option<usize> {
                chain::find_value(self, value)
            }
        }
    };
}

registry_reads!(NamedBufferWriter);
registry_reads!(NamedBufferReader);

// =============================================================================
// WRITER
// =============================================================================

impl<V: Clone + Default> NamedBufferWriter<V> {
    /// Inserts `name` or replaces its value; returns the stable id.
    pub fn add(&mut self, name: &str, value: V) -> usize {
        chain::add(self, name, value)
    }

    /// Removes a live id. Returns `false` if it was not live.
    pub fn remove_id(&mut self, id: usize) -> bool {
        chain::remove(self, id).is_some()
    }

    /// Removes a live name. Returns `false` if it was absent.
    pub fn remove_name(&mut self, name: &str) -> bool {
        match self.id_of(name) {
            Some(id) => self.remove_id(id),
            None => false,
        }
    }

    /// Renames a live id, keeping its id and insertion position.
    ///
    /// # Errors
    ///
    /// [`StorageError::IdOutOfRange`], [`StorageError::IdNotFound`] or
    /// [`StorageError::DuplicateName`]; nothing changes on error.
    pub fn rename(&mut self, id: usize, new_name: &str) -> StorageResult<()> {
        chain::rename(self, id, new_name)
    }

    /// Renames the entry holding `name` and returns its id.
    ///
    /// # Errors
    ///
    /// [`StorageError::NameNotFound`] if no entry has `name`,
    /// [`StorageError::DuplicateName`] if another id holds `new_name`.
    pub fn rename_name(&mut self, name: &str, new_name: &str) -> StorageResult<usize> {
        chain::rename_name(self, name, new_name)
    }

    /// Removes a live id and returns its value.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn pop_id(&mut self, id: usize) -> StorageResult<V> {
        chain::live_entry(self, id)?;
        chain::remove(self, id).ok_or(StorageError::IdNotFound(id))
    }

    /// Removes a live name and returns its value.
    ///
    /// # Errors
    ///
    /// [`StorageError::NameNotFound`] if no entry has this name.
    pub fn pop_name(&mut self, name: &str) -> StorageResult<V> {
        self.id_of(name)
            .and_then(|id| chain::remove(self, id))
            .ok_or_else(|| StorageError::NameNotFound(name.to_owned()))
    }

    /// Raises capacity to `capacity`. Smaller values are ignored.
    pub fn expand(&mut self, capacity: usize) {
        chain::expand(self, capacity);
    }

    /// Lowers capacity toward `capacity`, never below the highest live id,
    /// and releases entry pages above it.
    pub fn constrict(&mut self, capacity: usize) {
        chain::constrict(self, capacity);
    }

    /// Removes every entry; capacity is kept.
    pub fn clear(&mut self) {
        chain::clear(self);
    }

    /// Publishes entries, bucket heads and the header.
    pub fn commit_write(&mut self) -> usize {
        let _frame = self.gate.enter();
        self.entries.commit_write() + self.bucket_heads.commit_write() + self.header.commit_write()
    }

    /// Number of entry slots waiting for `commit_write`.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.entries.pending_writes()
    }
}

impl<V: Clone + Default + PartialEq> NamedBufferWriter<V> {
    /// Removes the oldest entry holding `value`. Returns `false` if none does.
    pub fn remove_value(&mut self, value: &V) -> bool {
        match self.id_of_value(value) {
            Some(id) => self.remove_id(id),
            None => false,
        }
    }

    /// Removes the oldest entry holding `value` and returns it.
    ///
    /// # Errors
    ///
    /// [`StorageError::ValueNotFound`] if no live entry holds `value`.
    pub fn pop_value(&mut self, value: &V) -> StorageResult<V> {
        self.id_of_value(value)
            .and_then(|id| chain::remove(self, id))
            .ok_or(StorageError::ValueNotFound)
    }
}

impl<V: Clone + Default> CommitWrite for NamedBufferWriter<V> {
    fn commit_write(&mut self) -> usize {
        NamedBufferWriter::commit_write(self)
    }
}

impl<V: Clone + Default> RegistryView for NamedBufferWriter<V> {
    type Value = V;

    fn hash_size(&self) -> usize {
        self.bucket_tails.len()
    }

    fn header(&self) -> ListHeader {
        *self.header.get()
    }

    fn bucket_head(&self, bucket: usize) -> usize {
        self.bucket_heads.get(bucket)
    }

    fn entry(&self, id: usize) -> Option<&NameEntry> {
        self.entries.secondary_ref(id)
    }

    fn value(&self, id: usize) -> Option<&V> {
        self.entries.primary_ref(id)
    }
}

impl<V: Clone + Default> RegistryStore for NamedBufferWriter<V> {
    fn set_header(&mut self, header: ListHeader) {
        self.header.set(header);
    }

    fn set_bucket_head(&mut self, bucket: usize, id: usize) {
        self.bucket_heads.set(bucket, id);
    }

    fn bucket_tail(&self, bucket: usize) -> usize {
        self.bucket_tails[bucket]
    }

    fn set_bucket_tail(&mut self, bucket: usize, id: usize) {
        self.bucket_tails[bucket] = id;
    }

    fn order_tail(&self) -> usize {
        self.order_tail
    }

    fn set_order_tail(&mut self, id: usize) {
        self.order_tail = id;
    }

    fn write_entry(&mut self, id: usize, entry: NameEntry) {
        self.entries.set_secondary(id, entry);
    }

    fn edit_entry<F: FnOnce(&mut NameEntry)>(&mut self, id: usize, edit: F) {
        if let Some(mut entry) = self.entries.secondary_ref(id).cloned() {
            edit(&mut entry);
            self.entries.set_secondary(id, entry);
        }
    }

    fn write_value(&mut self, id: usize, value: V) {
        self.entries.set_primary(id, value);
    }

    fn take_value(&mut self, id: usize) -> V {
        let value = self.entries.get_primary(id);
        self.entries.set_primary(id, V::default());
        value
    }

    fn ids(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    fn reallocate(&mut self, capacity: usize) {
        // Pages grow on demand; only shrinking releases anything.
        if capacity < self.header.get().capacity {
            self.entries.shrink_to(capacity.saturating_sub(1));
        }
    }
}

// =============================================================================
// READER
// =============================================================================

impl<V: Clone + Default> NamedBufferReader<V> {
    /// Pulls the writer's last published state.
    pub fn commit_read(&mut self) -> usize {
        let _frame = self.gate.enter();
        self.entries.commit_read() + self.bucket_heads.commit_read() + self.header.commit_read()
    }
}

impl<V: Clone + Default> CommitRead for NamedBufferReader<V> {
    fn commit_read(&mut self) -> usize {
        NamedBufferReader::commit_read(self)
    }
}

impl<V: Clone + Default> RegistryView for NamedBufferReader<V> {
    type Value = V;

    fn hash_size(&self) -> usize {
        self.hash_size
    }

    fn header(&self) -> ListHeader {
        *self.header.get()
    }

    fn bucket_head(&self, bucket: usize) -> usize {
        self.bucket_heads.get(bucket)
    }

    fn entry(&self, id: usize) -> Option<&NameEntry> {
        self.entries.secondary_ref(id)
    }

    fn value(&self, id: usize) -> Option<&V> {
        self.entries.primary_ref(id)
    }
}

// =============================================================================
// PAIR
// =============================================================================

impl<V: Clone + Default> NamedBuffer<V> {
    /// Creates an empty buffered registry with default paging.
    ///
    /// # Panics
    ///
    /// Panics if `hash_size` is zero.
    #[must_use]
    pub fn new(capacity: usize, hash_size: usize) -> Self {
        Self::with_config(&StorageConfig {
            initial_capacity: capacity,
            hash_size,
            ..StorageConfig::default()
        })
    }

    /// Creates an empty buffered registry sized by `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config.hash_size` is zero.
    #[must_use]
    pub fn with_config(config: &StorageConfig) -> Self {
        let hash_size = config.hash_size;
        assert!(hash_size > 0, "hash_size must be at least 1");
        let capacity = config.initial_capacity;

        let (entries_w, entries_r) = DualTripleBuffer::with_config(config).split();
        let heads_config = StorageConfig {
            initial_capacity: hash_size,
            ..*config
        };
        let (heads_w, heads_r) =
            TripleBuffer::<usize, FlatArray<usize>>::with_initial(&NIL, &heads_config).split();
        let (header_w, header_r) = ValueBuffer::new(ListHeader::empty(capacity)).split();
        let gate = CommitGate::default();

        Self {
            writer: NamedBufferWriter {
                entries: entries_w,
                bucket_heads: heads_w,
                bucket_tails: vec![NIL; hash_size],
                order_tail: NIL,
                header: header_w,
                ids: IdAllocator::default(),
                gate: gate.clone(),
            },
            reader: NamedBufferReader {
                entries: entries_r,
                bucket_heads: heads_r,
                header: header_r,
                hash_size,
                gate,
            },
        }
    }

    /// Separates the writer and reader halves.
    #[must_use]
    pub fn split(self) -> (NamedBufferWriter<V>, NamedBufferReader<V>) {
        (self.writer, self.reader)
    }

    /// Inserts or updates `name`; `None` under `ReadOnly`.
    pub fn add(&mut self, mode: TransactionMode, name: &str, value: V) -> Option<usize> {
        mode.is_writable().then(|| self.writer.add(name, value))
    }

    /// Value of a live id in the copy `mode` addresses.
    ///
    /// # Errors
    ///
    /// See [`NamedBufferWriter::get`].
    pub fn get(&self, mode: TransactionMode, id: usize) -> StorageResult<&V> {
        match mode {
            TransactionMode::WriteRead => self.writer.get(id),
            TransactionMode::ReadOnly => self.reader.get(id),
        }
    }

    /// Value of a live name in the copy `mode` addresses.
    ///
    /// # Errors
    ///
    /// [`StorageError::NameNotFound`] if no entry has this name.
    pub fn get_by_name(&self, mode: TransactionMode, name: &str) -> StorageResult<&V> {
        match mode {
            TransactionMode::WriteRead => self.writer.get_by_name(name),
            TransactionMode::ReadOnly => self.reader.get_by_name(name),
        }
    }

    /// Value of a live id, if any.
    #[must_use]
    pub fn try_get(&self, mode: TransactionMode, id: usize) -> Option<&V> {
        self.get(mode, id).ok()
    }

    /// Value of a live name, if any.
    #[must_use]
    pub fn try_get_by_name(&self, mode: TransactionMode, name: &str) -> Option<&V> {
        self.get_by_name(mode, name).ok()
    }

    /// Whether `id` is live.
    #[must_use]
    pub fn contains_id(&self, mode: TransactionMode, id: usize) -> bool {
        match mode {
            TransactionMode::WriteRead => self.writer.contains_id(id),
            TransactionMode::ReadOnly => self.reader.contains_id(id),
        }
    }

    /// Whether some entry has `name`.
    #[must_use]
    pub fn contains_name(&self, mode: TransactionMode, name: &str) -> bool {
        self.id_of(mode, name).is_some()
    }

    /// Id of `name`, if live.
    #[must_use]
    pub fn id_of(&self, mode: TransactionMode, name: &str) -> Option<usize> {
        match mode {
            TransactionMode::WriteRead => self.writer.id_of(name),
            TransactionMode::ReadOnly => self.reader.id_of(name),
        }
    }

    /// Name of a live id.
    ///
    /// # Errors
    ///
    /// See [`NamedBufferWriter::name_of`].
    pub fn name_of(&self, mode: TransactionMode, id: usize) -> StorageResult<&str> {
        match mode {
            TransactionMode::WriteRead => self.writer.name_of(id),
            TransactionMode::ReadOnly => self.reader.name_of(id),
        }
    }

    /// Removes a live id; `false` if absent or under `ReadOnly`.
    pub fn remove_id(&mut self, mode: TransactionMode, id: usize) -> bool {
        mode.is_writable() && self.writer.remove_id(id)
    }

    /// Removes a live name; `false` if absent or under `ReadOnly`.
    pub fn remove_name(&mut self, mode: TransactionMode, name: &str) -> bool {
        mode.is_writable() && self.writer.remove_name(name)
    }

    /// Renames a live id. A no-op under `ReadOnly`.
    ///
    /// # Errors
    ///
    /// See [`NamedBufferWriter::rename`].
    pub fn rename(&mut self, mode: TransactionMode, id: usize, new_name: &str) -> StorageResult<()> {
        if !mode.is_writable() {
            return Ok(());
        }
        self.writer.rename(id, new_name)
    }

    /// Renames the entry holding `name` and returns its id. Under
    /// `ReadOnly` nothing is renamed and the snapshot's id for `name` is
    /// returned.
    ///
    /// # Errors
    ///
    /// See [`NamedBufferWriter::rename_name`]; under `ReadOnly` only
    /// [`StorageError::NameNotFound`].
    pub fn rename_name(
        &mut self,
        mode: TransactionMode,
        name: &str,
        new_name: &str,
    ) -> StorageResult<usize> {
        match mode {
            TransactionMode::WriteRead => self.writer.rename_name(name, new_name),
            TransactionMode::ReadOnly => self
                .reader
                .id_of(name)
                .ok_or_else(|| StorageError::NameNotFound(name.to_owned())),
        }
    }

    /// Removes a live id and returns its value. Under `ReadOnly` the
    /// snapshot's value is returned and nothing is removed.
    ///
    /// # Errors
    ///
    /// See [`NamedBufferWriter::get`].
    pub fn pop_id(&mut self, mode: TransactionMode, id: usize) -> StorageResult<V> {
        match mode {
            TransactionMode::WriteRead => self.writer.pop_id(id),
            TransactionMode::ReadOnly => self.reader.get(id).cloned(),
        }
    }

    /// Removes a live name and returns its value. Under `ReadOnly` the
    /// snapshot's value is returned and nothing is removed.
    ///
    /// # Errors
    ///
    /// [`StorageError::NameNotFound`] if no entry has this name.
    pub fn pop_name(&mut self, mode: TransactionMode, name: &str) -> StorageResult<V> {
        match mode {
            TransactionMode::WriteRead => self.writer.pop_name(name),
            TransactionMode::ReadOnly => self.reader.get_by_name(name).cloned(),
        }
    }

    /// Live entries of the copy `mode` addresses, in insertion order.
    pub fn iter(&self, mode: TransactionMode) -> Box<dyn Iterator<Item = (usize, &str, &V)> + '_> {
        match mode {
            TransactionMode::WriteRead => Box::new(self.writer.iter()),
            TransactionMode::ReadOnly => Box::new(self.reader.iter()),
        }
    }

    /// Raises capacity. A no-op under `ReadOnly`.
    pub fn expand(&mut self, mode: TransactionMode, capacity: usize) {
        if mode.is_writable() {
            self.writer.expand(capacity);
        }
    }

    /// Lowers capacity, never below the highest live id. A no-op under
    /// `ReadOnly`.
    pub fn constrict(&mut self, mode: TransactionMode, capacity: usize) {
        if mode.is_writable() {
            self.writer.constrict(capacity);
        }
    }

    /// Removes every entry. A no-op under `ReadOnly`.
    pub fn clear(&mut self, mode: TransactionMode) {
        if mode.is_writable() {
            self.writer.clear();
        }
    }

    /// Number of live entries in the copy `mode` addresses.
    #[must_use]
    pub fn len(&self, mode: TransactionMode) -> usize {
        match mode {
            TransactionMode::WriteRead => self.writer.len(),
            TransactionMode::ReadOnly => self.reader.len(),
        }
    }

    /// Whether the copy `mode` addresses has no live entry.
    #[must_use]
    pub fn is_empty(&self, mode: TransactionMode) -> bool {
        self.len(mode) == 0
    }

    /// Id capacity as seen by the copy `mode` addresses.
    #[must_use]
    pub fn capacity(&self, mode: TransactionMode) -> usize {
        match mode {
            TransactionMode::WriteRead => self.writer.capacity(),
            TransactionMode::ReadOnly => self.reader.capacity(),
        }
    }

    /// Number of hash buckets.
    #[must_use]
    pub fn hash_size(&self) -> usize {
        self.reader.hash_size
    }

    /// Publishes the writer's changes.
    pub fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }

    /// Pulls the published changes into the reader's snapshot.
    pub fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }
}

impl<V: Clone + Default + PartialEq> NamedBuffer<V> {
    /// Whether some live entry holds `value`.
    #[must_use]
    pub fn contains_value(&self, mode: TransactionMode, value: &V) -> bool {
        self.id_of_value(mode, value).is_some()
    }

    /// Id of the oldest live entry holding `value`.
    #[must_use]
    pub fn id_of_value(&self, mode: TransactionMode, value: &V) -> Option<usize> {
        match mode {
            TransactionMode::WriteRead => self.writer.id_of_value(value),
            TransactionMode::ReadOnly => self.reader.id_of_value(value),
        }
    }

    /// Removes the oldest entry holding `value`; `false` if none does or
    /// under `ReadOnly`.
    pub fn remove_value(&mut self, mode: TransactionMode, value: &V) -> bool {
        mode.is_writable() && self.writer.remove_value(value)
    }

    /// Removes the oldest entry holding `value` and returns it. Under
    /// `ReadOnly` nothing is removed.
    ///
    /// # Errors
    ///
    /// [`StorageError::ValueNotFound`] if no live entry holds `value`.
    pub fn pop_value(&mut self, mode: TransactionMode, value: &V) -> StorageResult<V> {
        match mode {
            TransactionMode::WriteRead => self.writer.pop_value(value),
            TransactionMode::ReadOnly => self
                .reader
                .id_of_value(value)
                .and_then(|id| self.reader.try_get(id).cloned())
                .ok_or(StorageError::ValueNotFound),
        }
    }
}

impl NamedBuffer<()> {
    /// Registers `name`, returning its id; `None` under `ReadOnly`.
    pub fn add_name(&mut self, mode: TransactionMode, name: &str) -> Option<usize> {
        self.add(mode, name, ())
    }
}

impl<V: Clone + Default> Default for NamedBuffer<V> {
    fn default() -> Self {
        Self::with_config(&StorageConfig::default())
    }
}

impl<V: Clone + Default> CommitWrite for NamedBuffer<V> {
    fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }
}

impl<V: Clone + Default> CommitRead for NamedBuffer<V> {
    fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }
}

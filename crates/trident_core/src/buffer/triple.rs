//! # Triple Buffer
//!
//! One writer and one reader share a logical sequence without locking it.
//!
//! ## Protocol
//!
//! 1. The writer `set`s into copy 0; each distinct index is queued once.
//! 2. `commit_write` drains the 0→1 queue into copy 1 and re-queues each
//!    index for 1→2.
//! 3. `commit_read` drains the 1→2 queue into copy 2, the reader's snapshot.
//!
//! A write is visible to the reader only after both commits, in that order.
//! Repeated writes to one index between commits coalesce; the last one wins.
//!
//! ## Thread Safety
//!
//! - [`BufferWriter`]: owns copy 0 and the 0→1 queue.
//! - [`BufferReader`]: owns copy 2.
//! - Copy 1 and the 1→2 queue are shared through `Arc<Mutex<..>>`; the lock is
//!   held only for the length of one drain.
//!
//! [`TripleBuffer`] is the pair in one value for single-owner frame loops;
//! [`TripleBuffer::split`] hands the halves to separate threads.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::{
    CommitRead, CommitWrite, DirtyQueue, PagedArray, Sequence, TransactionMode,
};
use crate::config::StorageConfig;

/// The middle copy, touched by both roles.
struct SharedCopy<S> {
    values: S,
    /// Indices published by the writer, not yet pulled by the reader.
    dirty: DirtyQueue,
    /// Lowest published `shrink_to` bound the reader has not applied yet.
    pending_shrink: Option<usize>,
}

fn lowest(pending: Option<usize>, bound: usize) -> usize {
    pending.map_or(bound, |p| p.min(bound))
}

impl<S> SharedCopy<S> {
    fn new(values: S) -> Self {
        Self {
            values,
            dirty: DirtyQueue::new(),
            pending_shrink: None,
        }
    }
}

/// Writer half of a [`TripleBuffer`].
pub struct BufferWriter<T, S = PagedArray<T>> {
    values: S,
    dirty: DirtyQueue,
    /// Lowest `shrink_to` bound not yet applied to the shared copy.
    pending_shrink: Option<usize>,
    shared: Arc<Mutex<SharedCopy<S>>>,
    _marker: PhantomData<T>,
}

/// Reader half of a [`TripleBuffer`].
pub struct BufferReader<T, S = PagedArray<T>> {
    values: S,
    shared: Arc<Mutex<SharedCopy<S>>>,
    _marker: PhantomData<T>,
}

/// Single-writer, single-reader triple buffer over a [`Sequence`].
///
/// ## Usage
///
/// ```rust
/// use trident_core::{TripleBuffer, TransactionMode::{ReadOnly, WriteRead}};
///
/// let mut buffer: TripleBuffer<u32> = TripleBuffer::new(8, 1);
/// buffer.set(WriteRead, 5, 42);
/// assert_eq!(buffer.get(ReadOnly, 5), 0);
///
/// buffer.commit_write();
/// buffer.commit_read();
/// assert_eq!(buffer.get(ReadOnly, 5), 42);
/// ```
pub struct TripleBuffer<T, S = PagedArray<T>> {
    writer: BufferWriter<T, S>,
    reader: BufferReader<T, S>,
}

// =============================================================================
// WRITER
// =============================================================================

impl<T: Clone + Default, S: Sequence<T>> BufferWriter<T, S> {
    /// Value at `index` in copy 0.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        self.values.get(index)
    }

    /// Borrowed value at `index` in copy 0.
    #[inline]
    #[must_use]
    pub fn get_ref(&self, index: usize) -> Option<&T> {
        self.values.get_ref(index)
    }

    /// Writes copy 0 and queues `index` for publication.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        self.values.set(index, value);
        self.dirty.push(index);
    }

    /// Moves a range inside copy 0; every destination index is queued.
    pub fn copy_range(&mut self, src: usize, len: usize, dst: usize) {
        self.values.copy_range(src, len, dst);
        for index in dst..dst + len {
            self.dirty.push(index);
        }
    }

    /// Releases storage above `index` in copy 0 and drops queued indices
    /// whose storage went away. Copy 1 follows on the next `commit_write`,
    /// copy 2 on the `commit_read` after it.
    pub fn shrink_to(&mut self, index: usize) {
        self.values.shrink_to(index);
        self.dirty.purge_from(self.values.len());
        self.pending_shrink = Some(lowest(self.pending_shrink, index));
    }

    /// Shrinks the shared copy and hands the bound on to the reader.
    fn publish_shrink(shared: &mut SharedCopy<S>, bound: usize) {
        shared.values.shrink_to(bound);
        shared.dirty.purge_from(shared.values.len());
        shared.pending_shrink = Some(lowest(shared.pending_shrink, bound));
    }

    /// Publishes a pending shrink, then drains the 0→1 queue into the shared
    /// copy.
    ///
    /// Returns the number of indices transferred.
    pub fn commit_write(&mut self) -> usize {
        if self.dirty.is_empty() && self.pending_shrink.is_none() {
            return 0;
        }
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        if let Some(bound) = self.pending_shrink.take() {
            Self::publish_shrink(shared, bound);
        }
        let mut transferred = 0;
        while let Some(index) = self.dirty.pop() {
            shared.values.set(index, self.values.get(index));
            shared.dirty.push(index);
            transferred += 1;
        }
        drop(guard);
        tracing::trace!(transferred, "triple buffer write commit");
        transferred
    }

    /// Number of indices waiting for `commit_write`.
    #[inline]
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.dirty.len()
    }

    /// Clones copy 0 into `out`, front to back, stopping at whichever ends
    /// first.
    pub fn copy_to(&self, out: &mut [T]) {
        copy_sequence(&self.values, out);
    }

    /// Number of backed elements in copy 0.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether copy 0 backs no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates copy 0 in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.values.len()).filter_map(move |i| self.values.get_ref(i))
    }
}

impl<T: Clone + Default, S: Sequence<T>> CommitWrite for BufferWriter<T, S> {
    fn commit_write(&mut self) -> usize {
        BufferWriter::commit_write(self)
    }
}

// =============================================================================
// READER
// =============================================================================

impl<T: Clone + Default, S: Sequence<T>> BufferReader<T, S> {
    /// Value at `index` in the reader's snapshot.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        self.values.get(index)
    }

    /// Borrowed value at `index` in the reader's snapshot.
    #[inline]
    #[must_use]
    pub fn get_ref(&self, index: usize) -> Option<&T> {
        self.values.get_ref(index)
    }

    /// Drains the 1→2 queue into the snapshot.
    ///
    /// Returns the number of indices transferred.
    pub fn commit_read(&mut self) -> usize {
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        if let Some(bound) = shared.pending_shrink.take() {
            self.values.shrink_to(bound);
        }
        let mut transferred = 0;
        while let Some(index) = shared.dirty.pop() {
            self.values.set(index, shared.values.get(index));
            transferred += 1;
        }
        drop(guard);
        if transferred > 0 {
            tracing::trace!(transferred, "triple buffer read commit");
        }
        transferred
    }

    /// Number of indices published but not yet pulled.
    #[must_use]
    pub fn pending_reads(&self) -> usize {
        self.shared.lock().dirty.len()
    }

    /// Number of backed elements in the snapshot.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the snapshot backs no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates the snapshot in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.values.len()).filter_map(move |i| self.values.get_ref(i))
    }

    /// Clones the snapshot into `out`, front to back, stopping at whichever
    /// ends first.
    pub fn copy_to(&self, out: &mut [T]) {
        copy_sequence(&self.values, out);
    }
}

fn copy_sequence<T: Clone, S: Sequence<T>>(values: &S, out: &mut [T]) {
    for (index, slot) in out.iter_mut().take(values.len()).enumerate() {
        if let Some(value) = values.get_ref(index) {
            slot.clone_from(value);
        }
    }
}

impl<T: Clone + Default, S: Sequence<T>> CommitRead for BufferReader<T, S> {
    fn commit_read(&mut self) -> usize {
        BufferReader::commit_read(self)
    }
}

// =============================================================================
// PAIR
// =============================================================================

impl<T: Clone + Default> TripleBuffer<T, PagedArray<T>> {
    /// Creates a paged triple buffer.
    ///
    /// # Arguments
    ///
    /// * `page_power` - Page size as a power of two
    /// * `initial_page_count` - Page-table slots reserved up front
    #[must_use]
    pub fn new(page_power: u32, initial_page_count: usize) -> Self {
        Self::with_config(&StorageConfig {
            page_power,
            initial_page_count,
            ..StorageConfig::default()
        })
    }
}

impl<T: Clone + Default, S: Sequence<T>> TripleBuffer<T, S> {
    /// Creates a triple buffer whose copies are sized by `config`.
    #[must_use]
    pub fn with_config(config: &StorageConfig) -> Self {
        let shared = Arc::new(Mutex::new(SharedCopy::new(S::from_config(config))));
        Self {
            writer: BufferWriter {
                values: S::from_config(config),
                dirty: DirtyQueue::new(),
                pending_shrink: None,
                shared: Arc::clone(&shared),
                _marker: PhantomData,
            },
            reader: BufferReader {
                values: S::from_config(config),
                shared,
                _marker: PhantomData,
            },
        }
    }

    /// Creates a triple buffer with every initially backed element of all
    /// three copies set to `value`.
    #[must_use]
    pub fn with_initial(value: &T, config: &StorageConfig) -> Self {
        let mut buffer = Self::with_config(config);
        buffer.writer.values.fill(value);
        buffer.writer.shared.lock().values.fill(value);
        buffer.reader.values.fill(value);
        buffer
    }

    /// Separates the writer and reader halves.
    #[must_use]
    pub fn split(self) -> (BufferWriter<T, S>, BufferReader<T, S>) {
        (self.writer, self.reader)
    }

    /// Writer half.
    #[inline]
    #[must_use]
    pub fn writer(&self) -> &BufferWriter<T, S> {
        &self.writer
    }

    /// Reader half.
    #[inline]
    #[must_use]
    pub fn reader(&self) -> &BufferReader<T, S> {
        &self.reader
    }

    /// Value at `index` in the copy `mode` addresses.
    #[inline]
    #[must_use]
    pub fn get(&self, mode: TransactionMode, index: usize) -> T {
        match mode {
            TransactionMode::WriteRead => self.writer.get(index),
            TransactionMode::ReadOnly => self.reader.get(index),
        }
    }

    /// Borrowed value at `index` in the copy `mode` addresses.
    #[inline]
    #[must_use]
    pub fn get_ref(&self, mode: TransactionMode, index: usize) -> Option<&T> {
        match mode {
            TransactionMode::WriteRead => self.writer.get_ref(index),
            TransactionMode::ReadOnly => self.reader.get_ref(index),
        }
    }

    /// Writes `value` at `index`; ignored under `ReadOnly`.
    #[inline]
    pub fn set(&mut self, mode: TransactionMode, index: usize, value: T) {
        if mode.is_writable() {
            self.writer.set(index, value);
        }
    }

    /// Moves a range in copy 0 and queues its destination; ignored under
    /// `ReadOnly`.
    pub fn copy_range(&mut self, mode: TransactionMode, src: usize, len: usize, dst: usize) {
        if mode.is_writable() {
            self.writer.copy_range(src, len, dst);
        }
    }

    /// Releases storage above `index` in all three copies.
    pub fn shrink_to(&mut self, index: usize) {
        self.writer.shrink_to(index);
        let mut guard = self.writer.shared.lock();
        if let Some(bound) = self.writer.pending_shrink.take() {
            BufferWriter::<T, S>::publish_shrink(&mut guard, bound);
        }
        if let Some(bound) = guard.pending_shrink.take() {
            self.reader.values.shrink_to(bound);
        }
    }

    /// Drains the 0→1 queue. See [`BufferWriter::commit_write`].
    pub fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }

    /// Drains the 1→2 queue. See [`BufferReader::commit_read`].
    pub fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }

    /// Number of indices waiting for `commit_write`.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.writer.pending_writes()
    }

    /// Number of indices waiting for `commit_read`.
    #[must_use]
    pub fn pending_reads(&self) -> usize {
        self.reader.pending_reads()
    }

    /// Number of backed elements in the copy `mode` addresses.
    #[must_use]
    pub fn len(&self, mode: TransactionMode) -> usize {
        match mode {
            TransactionMode::WriteRead => self.writer.len(),
            TransactionMode::ReadOnly => self.reader.len(),
        }
    }

    /// Iterates the copy `mode` addresses in index order.
    pub fn iter(&self, mode: TransactionMode) -> impl Iterator<Item = &T> + '_ {
        let values = match mode {
            TransactionMode::WriteRead => &self.writer.values,
            TransactionMode::ReadOnly => &self.reader.values,
        };
        (0..values.len()).filter_map(move |i| values.get_ref(i))
    }

    /// Clones the copy `mode` addresses into `out`. See
    /// [`BufferReader::copy_to`].
    pub fn copy_to(&self, mode: TransactionMode, out: &mut [T]) {
        match mode {
            TransactionMode::WriteRead => self.writer.copy_to(out),
            TransactionMode::ReadOnly => self.reader.copy_to(out),
        }
    }
}

impl<T: Clone + Default, S: Sequence<T>> Default for TripleBuffer<T, S> {
    fn default() -> Self {
        Self::with_config(&StorageConfig::default())
    }
}

impl<T: Clone + Default, S: Sequence<T>> CommitWrite for TripleBuffer<T, S> {
    fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }
}

impl<T: Clone + Default, S: Sequence<T>> CommitRead for TripleBuffer<T, S> {
    fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FlatArray;
    use crate::buffer::TransactionMode::{ReadOnly, WriteRead};

    #[test]
    fn test_write_invisible_until_both_commits() {
        let mut buffer: TripleBuffer<i32> = TripleBuffer::new(4, 1);
        buffer.set(WriteRead, 3, 9);
        assert_eq!(buffer.get(WriteRead, 3), 9);
        assert_eq!(buffer.get(ReadOnly, 3), 0);

        assert_eq!(buffer.commit_write(), 1);
        assert_eq!(buffer.get(ReadOnly, 3), 0);

        assert_eq!(buffer.commit_read(), 1);
        assert_eq!(buffer.get(ReadOnly, 3), 9);
    }

    #[test]
    fn test_commit_read_before_write_transfers_nothing() {
        let mut buffer: TripleBuffer<i32> = TripleBuffer::new(4, 1);
        buffer.set(WriteRead, 1, 5);
        assert_eq!(buffer.commit_read(), 0);
        assert_eq!(buffer.get(ReadOnly, 1), 0);
    }

    #[test]
    fn test_repeated_writes_coalesce() {
        let mut buffer: TripleBuffer<i32> = TripleBuffer::new(4, 1);
        for v in 0..10 {
            buffer.set(WriteRead, 2, v);
        }
        assert_eq!(buffer.pending_writes(), 1);
        assert_eq!(buffer.commit_write(), 1);
        assert_eq!(buffer.pending_reads(), 1);
        buffer.commit_read();
        assert_eq!(buffer.get(ReadOnly, 2), 9);
    }

    #[test]
    fn test_read_only_set_is_ignored() {
        let mut buffer: TripleBuffer<i32> = TripleBuffer::new(4, 1);
        buffer.set(ReadOnly, 0, 1);
        buffer.copy_range(ReadOnly, 0, 4, 8);
        assert_eq!(buffer.pending_writes(), 0);
        assert_eq!(buffer.get(WriteRead, 0), 0);
        assert_eq!(buffer.len(WriteRead), 16);
    }

    #[test]
    fn test_copy_range_publishes_destination() {
        let mut buffer: TripleBuffer<i32> = TripleBuffer::new(2, 1);
        for i in 0..4 {
            buffer.set(WriteRead, i, i as i32 + 1);
        }
        buffer.commit_write();
        buffer.commit_read();
        buffer.copy_range(WriteRead, 0, 4, 6);
        assert_eq!(buffer.pending_writes(), 4);
        buffer.commit_write();
        buffer.commit_read();
        let snapshot: Vec<i32> = (0..10).map(|i| buffer.get(ReadOnly, i)).collect();
        assert_eq!(snapshot, vec![1, 2, 3, 4, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_shrink_reaches_all_copies() {
        let mut buffer: TripleBuffer<i32> = TripleBuffer::new(2, 1);
        buffer.set(WriteRead, 10, 1);
        buffer.commit_write();
        buffer.commit_read();
        buffer.set(WriteRead, 9, 2);
        buffer.commit_write();
        buffer.set(WriteRead, 11, 3);

        buffer.shrink_to(3);
        assert_eq!(buffer.pending_writes(), 0);
        assert_eq!(buffer.pending_reads(), 0);
        assert_eq!(buffer.len(WriteRead), 4);
        assert_eq!(buffer.len(ReadOnly), 4);
        assert_eq!(buffer.get(ReadOnly, 10), 0);
    }

    #[test]
    fn test_split_halves_shrink_travels_with_commits() {
        let buffer: TripleBuffer<i32> = TripleBuffer::new(2, 1);
        let (mut writer, mut reader) = buffer.split();
        writer.set(10, 1);
        writer.commit_write();
        reader.commit_read();
        assert_eq!(reader.get(10), 1);

        writer.shrink_to(0);
        assert_eq!(writer.len(), 4);
        reader.commit_read();
        assert_eq!(reader.get(10), 1);
        assert_eq!(reader.len(), 12);

        assert_eq!(writer.commit_write(), 0);
        assert_eq!(reader.get(10), 1);
        reader.commit_read();
        assert_eq!(reader.get(10), 0);
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn test_shrink_drops_writes_queued_before_it() {
        let (mut writer, mut reader) = TripleBuffer::<i32>::new(2, 1).split();
        writer.set(9, 5);
        writer.commit_write();
        writer.shrink_to(3);
        writer.set(2, 7);
        assert_eq!(writer.commit_write(), 1);
        assert_eq!(reader.pending_reads(), 1);
        assert_eq!(reader.commit_read(), 1);
        assert_eq!(reader.get(2), 7);
        assert_eq!(reader.get(9), 0);
    }

    #[test]
    fn test_copy_to_addresses_mode() {
        let mut buffer: TripleBuffer<i32> = TripleBuffer::new(2, 1);
        for i in 0..6 {
            buffer.set(WriteRead, i, i as i32 + 1);
        }
        buffer.commit_write();
        buffer.commit_read();
        buffer.set(WriteRead, 0, 50);

        let mut out = [0; 5];
        buffer.copy_to(WriteRead, &mut out);
        assert_eq!(out, [50, 2, 3, 4, 5]);
        buffer.copy_to(ReadOnly, &mut out);
        assert_eq!(out, [1, 2, 3, 4, 5]);

        let mut wide = [-1; 10];
        buffer.copy_to(ReadOnly, &mut wide);
        assert_eq!(wide, [1, 2, 3, 4, 5, 6, 0, 0, -1, -1]);
    }

    #[test]
    fn test_with_initial_fills_all_copies() {
        let config = StorageConfig { page_power: 2, ..StorageConfig::default() };
        let buffer: TripleBuffer<i32> = TripleBuffer::with_initial(&-1, &config);
        assert_eq!(buffer.get(WriteRead, 3), -1);
        assert_eq!(buffer.get(ReadOnly, 3), -1);
        assert_eq!(buffer.get(ReadOnly, 4), 0);
    }

    #[test]
    fn test_flat_backing() {
        let config = StorageConfig { initial_capacity: 4, ..StorageConfig::default() };
        let mut buffer: TripleBuffer<u8, FlatArray<u8>> = TripleBuffer::with_config(&config);
        buffer.set(WriteRead, 20, 7);
        buffer.commit_write();
        buffer.commit_read();
        assert_eq!(buffer.get(ReadOnly, 20), 7);
        assert_eq!(buffer.iter(ReadOnly).filter(|v| **v == 7).count(), 1);
    }
}

//! # Dual-Value Triple Buffer
//!
//! The triple-buffer protocol over two co-located sequences, a primary and a
//! secondary, that share one dirty queue. Writing either half of an index
//! queues the pair; commits always move both values of an index together,
//! so the reader never observes a primary from one commit beside a secondary
//! from another.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::{
    CommitRead, CommitWrite, DirtyQueue, PagedArray, Sequence, TransactionMode,
};
use crate::config::StorageConfig;

struct SharedPair<SP, SQ> {
    primary: SP,
    secondary: SQ,
    dirty: DirtyQueue,
    pending_shrink: Option<usize>,
}

/// Writer half of a [`DualTripleBuffer`].
pub struct DualBufferWriter<P, Q, SP = PagedArray<P>, SQ = PagedArray<Q>> {
    primary: SP,
    secondary: SQ,
    dirty: DirtyQueue,
    pending_shrink: Option<usize>,
    shared: Arc<Mutex<SharedPair<SP, SQ>>>,
    _marker: PhantomData<(P, Q)>,
}

/// Reader half of a [`DualTripleBuffer`].
pub struct DualBufferReader<P, Q, SP = PagedArray<P>, SQ = PagedArray<Q>> {
    primary: SP,
    secondary: SQ,
    shared: Arc<Mutex<SharedPair<SP, SQ>>>,
    _marker: PhantomData<(P, Q)>,
}

/// Triple buffer holding a primary and a secondary value per index.
pub struct DualTripleBuffer<P, Q, SP = PagedArray<P>, SQ = PagedArray<Q>> {
    writer: DualBufferWriter<P, Q, SP, SQ>,
    reader: DualBufferReader<P, Q, SP, SQ>,
}

impl<P, Q, SP, SQ> DualBufferWriter<P, Q, SP, SQ>
where
    P: Clone + Default,
    Q: Clone + Default,
    SP: Sequence<P>,
    SQ: Sequence<Q>,
{
    /// Both values at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> (P, Q) {
        (self.primary.get(index), self.secondary.get(index))
    }

    /// Primary value at `index`.
    #[inline]
    #[must_use]
    pub fn get_primary(&self, index: usize) -> P {
        self.primary.get(index)
    }

    /// Secondary value at `index`.
    #[inline]
    #[must_use]
    pub fn get_secondary(&self, index: usize) -> Q {
        self.secondary.get(index)
    }

    /// Borrowed primary value at `index`.
    #[inline]
    #[must_use]
    pub fn primary_ref(&self, index: usize) -> Option<&P> {
        self.primary.get_ref(index)
    }

    /// Borrowed secondary value at `index`.
    #[inline]
    #[must_use]
    pub fn secondary_ref(&self, index: usize) -> Option<&Q> {
        self.secondary.get_ref(index)
    }

    /// Writes both values at `index`.
    #[inline]
    pub fn set(&mut self, index: usize, primary: P, secondary: Q) {
        self.primary.set(index, primary);
        self.secondary.set(index, secondary);
        self.dirty.push(index);
    }

    /// Writes the primary value at `index`.
    #[inline]
    pub fn set_primary(&mut self, index: usize, primary: P) {
        self.primary.set(index, primary);
        self.dirty.push(index);
    }

    /// Writes the secondary value at `index`.
    #[inline]
    pub fn set_secondary(&mut self, index: usize, secondary: Q) {
        self.secondary.set(index, secondary);
        self.dirty.push(index);
    }

    /// Moves a range of pairs; every destination index is queued.
    pub fn copy_range(&mut self, src: usize, len: usize, dst: usize) {
        self.primary.copy_range(src, len, dst);
        self.secondary.copy_range(src, len, dst);
        for index in dst..dst + len {
            self.dirty.push(index);
        }
    }

    /// Releases storage above `index` in copy 0; the shared copy follows on
    /// `commit_write` and the reader on the `commit_read` after it.
    pub fn shrink_to(&mut self, index: usize) {
        self.primary.shrink_to(index);
        self.secondary.shrink_to(index);
        self.dirty
            .purge_from(self.primary.len().min(self.secondary.len()));
        self.pending_shrink = Some(self.pending_shrink.map_or(index, |p| p.min(index)));
    }

    fn publish_shrink(shared: &mut SharedPair<SP, SQ>, bound: usize) {
        shared.primary.shrink_to(bound);
        shared.secondary.shrink_to(bound);
        shared
            .dirty
            .purge_from(shared.primary.len().min(shared.secondary.len()));
        shared.pending_shrink = Some(shared.pending_shrink.map_or(bound, |p| p.min(bound)));
    }

    /// Publishes a pending shrink, then drains the 0→1 queue, moving both
    /// values of every dirty index.
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
            shared.primary.set(index, self.primary.get(index));
            shared.secondary.set(index, self.secondary.get(index));
            shared.dirty.push(index);
            transferred += 1;
        }
        drop(guard);
        tracing::trace!(transferred, "dual buffer write commit");
        transferred
    }

    /// Number of indices waiting for `commit_write`.
    #[inline]
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.dirty.len()
    }

    /// Backed length of the primary sequence.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// Whether the primary sequence backs no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}

impl<P, Q, SP, SQ> DualBufferReader<P, Q, SP, SQ>
where
    P: Clone + Default,
    Q: Clone + Default,
    SP: Sequence<P>,
    SQ: Sequence<Q>,
{
    /// Both snapshot values at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> (P, Q) {
        (self.primary.get(index), self.secondary.get(index))
    }

    /// Snapshot primary value at `index`.
    #[inline]
    #[must_use]
    pub fn get_primary(&self, index: usize) -> P {
        self.primary.get(index)
    }

    /// Snapshot secondary value at `index`.
    #[inline]
    #[must_use]
    pub fn get_secondary(&self, index: usize) -> Q {
        self.secondary.get(index)
    }

    /// Borrowed snapshot primary value at `index`.
    #[inline]
    #[must_use]
    pub fn primary_ref(&self, index: usize) -> Option<&P> {
        self.primary.get_ref(index)
    }

    /// Borrowed snapshot secondary value at `index`.
    #[inline]
    #[must_use]
    pub fn secondary_ref(&self, index: usize) -> Option<&Q> {
        self.secondary.get_ref(index)
    }

    /// Drains the 1→2 queue into the snapshot.
    pub fn commit_read(&mut self) -> usize {
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        if let Some(bound) = shared.pending_shrink.take() {
            self.primary.shrink_to(bound);
            self.secondary.shrink_to(bound);
        }
        let mut transferred = 0;
        while let Some(index) = shared.dirty.pop() {
            self.primary.set(index, shared.primary.get(index));
            self.secondary.set(index, shared.secondary.get(index));
            transferred += 1;
        }
        drop(guard);
        if transferred > 0 {
            tracing::trace!(transferred, "dual buffer read commit");
        }
        transferred
    }

    /// Number of indices published but not yet pulled.
    #[must_use]
    pub fn pending_reads(&self) -> usize {
        self.shared.lock().dirty.len()
    }

    /// Backed length of the snapshot's primary sequence.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// Whether the snapshot backs no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}

impl<P, Q, SP, SQ> CommitWrite for DualBufferWriter<P, Q, SP, SQ>
where
    P: Clone + Default,
    Q: Clone + Default,
    SP: Sequence<P>,
    SQ: Sequence<Q>,
{
    fn commit_write(&mut self) -> usize {
        DualBufferWriter::commit_write(self)
    }
}

impl<P, Q, SP, SQ> CommitRead for DualBufferReader<P, Q, SP, SQ>
where
    P: Clone + Default,
    Q: Clone + Default,
    SP: Sequence<P>,
    SQ: Sequence<Q>,
{
    fn commit_read(&mut self) -> usize {
        DualBufferReader::commit_read(self)
    }
}

impl<P: Clone + Default, Q: Clone + Default> DualTripleBuffer<P, Q> {
    /// Creates a paged dual buffer.
    #[must_use]
    pub fn new(page_power: u32, initial_page_count: usize) -> Self {
        Self::with_config(&StorageConfig {
            page_power,
            initial_page_count,
            ..StorageConfig::default()
        })
    }
}

impl<P, Q, SP, SQ> DualTripleBuffer<P, Q, SP, SQ>
where
    P: Clone + Default,
    Q: Clone + Default,
    SP: Sequence<P>,
    SQ: Sequence<Q>,
{
    /// Creates a dual buffer whose copies are sized by `config`.
    #[must_use]
    pub fn with_config(config: &StorageConfig) -> Self {
        let shared = Arc::new(Mutex::new(SharedPair {
            primary: SP::from_config(config),
            secondary: SQ::from_config(config),
            dirty: DirtyQueue::new(),
            pending_shrink: None,
        }));
        Self {
            writer: DualBufferWriter {
                primary: SP::from_config(config),
                secondary: SQ::from_config(config),
                dirty: DirtyQueue::new(),
                pending_shrink: None,
                shared: Arc::clone(&shared),
                _marker: PhantomData,
            },
            reader: DualBufferReader {
                primary: SP::from_config(config),
                secondary: SQ::from_config(config),
                shared,
                _marker: PhantomData,
            },
        }
    }

    /// Separates the writer and reader halves.
    #[must_use]
    pub fn split(self) -> (DualBufferWriter<P, Q, SP, SQ>, DualBufferReader<P, Q, SP, SQ>) {
        (self.writer, self.reader)
    }

    /// Both values at `index` in the copy `mode` addresses.
    #[inline]
    #[must_use]
    pub fn get(&self, mode: TransactionMode, index: usize) -> (P, Q) {
        match mode {
            TransactionMode::WriteRead => self.writer.get(index),
            TransactionMode::ReadOnly => self.reader.get(index),
        }
    }

    /// Primary value at `index` in the copy `mode` addresses.
    #[inline]
    #[must_use]
    pub fn get_primary(&self, mode: TransactionMode, index: usize) -> P {
        match mode {
            TransactionMode::WriteRead => self.writer.get_primary(index),
            TransactionMode::ReadOnly => self.reader.get_primary(index),
        }
    }

    /// Secondary value at `index` in the copy `mode` addresses.
    #[inline]
    #[must_use]
    pub fn get_secondary(&self, mode: TransactionMode, index: usize) -> Q {
        match mode {
            TransactionMode::WriteRead => self.writer.get_secondary(index),
            TransactionMode::ReadOnly => self.reader.get_secondary(index),
        }
    }

    /// Writes both values; ignored under `ReadOnly`.
    #[inline]
    pub fn set(&mut self, mode: TransactionMode, index: usize, primary: P, secondary: Q) {
        if mode.is_writable() {
            self.writer.set(index, primary, secondary);
        }
    }

    /// Writes the primary value; ignored under `ReadOnly`.
    #[inline]
    pub fn set_primary(&mut self, mode: TransactionMode, index: usize, primary: P) {
        if mode.is_writable() {
            self.writer.set_primary(index, primary);
        }
    }

    /// Writes the secondary value; ignored under `ReadOnly`.
    #[inline]
    pub fn set_secondary(&mut self, mode: TransactionMode, index: usize, secondary: Q) {
        if mode.is_writable() {
            self.writer.set_secondary(index, secondary);
        }
    }

    /// Moves a range of pairs in copy 0; ignored under `ReadOnly`.
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
            DualBufferWriter::<P, Q, SP, SQ>::publish_shrink(&mut guard, bound);
        }
        if let Some(bound) = guard.pending_shrink.take() {
            self.reader.primary.shrink_to(bound);
            self.reader.secondary.shrink_to(bound);
        }
    }

    /// Drains the 0→1 queue.
    pub fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }

    /// Drains the 1→2 queue.
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

    /// Backed length of the copy `mode` addresses.
    #[must_use]
    pub fn len(&self, mode: TransactionMode) -> usize {
        match mode {
            TransactionMode::WriteRead => self.writer.len(),
            TransactionMode::ReadOnly => self.reader.len(),
        }
    }
}

impl<P, Q, SP, SQ> CommitWrite for DualTripleBuffer<P, Q, SP, SQ>
where
    P: Clone + Default,
    Q: Clone + Default,
    SP: Sequence<P>,
    SQ: Sequence<Q>,
{
    fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }
}

impl<P, Q, SP, SQ> CommitRead for DualTripleBuffer<P, Q, SP, SQ>
where
    P: Clone + Default,
    Q: Clone + Default,
    SP: Sequence<P>,
    SQ: Sequence<Q>,
{
    fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }
}

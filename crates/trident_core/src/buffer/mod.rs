//! # Buffer Module
//!
//! Growable sequences and the triple-buffered publication protocol built on
//! top of them.
//!
//! ## Architecture
//!
//! ```text
//!   writer thread                                   reader thread
//!  ┌──────────────┐   commit_write   ┌──────────┐   commit_read   ┌──────────────┐
//!  │ copy 0       │ ───────────────► │ copy 1   │ ──────────────► │ copy 2       │
//!  │ dirty 0→1    │   (dirty only)   │ dirty 1→2│   (dirty only)  │ (snapshot)   │
//!  └──────────────┘                  └──────────┘                 └──────────────┘
//!    BufferWriter                  Arc<Mutex<..>>                   BufferReader
//! ```
//!
//! Copy 0 belongs to the writer, copy 2 to the reader. Copy 1 and the 1→2
//! queue are the only state both roles touch; they sit behind one short-held
//! lock. Commit cost follows the number of distinct dirty indices, never the
//! sequence length.

pub mod dirty;
pub mod dual;
pub mod flat;
pub mod paged;
pub mod triple;
pub mod value;

pub use dirty::DirtyQueue;
pub use dual::{DualBufferReader, DualBufferWriter, DualTripleBuffer};
pub use flat::FlatArray;
pub use paged::PagedArray;
pub use triple::{BufferReader, BufferWriter, TripleBuffer};
pub use value::{ValueBuffer, ValueReader, ValueWriter};

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::config::StorageConfig;

/// Selects which copy of a buffer an operation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionMode {
    /// Writer role: reads and writes copy 0.
    WriteRead,
    /// Reader role: reads copy 2, mutations are silently ignored.
    ReadOnly,
}

impl TransactionMode {
    /// Index of the copy this mode addresses (0 or 2).
    #[inline]
    #[must_use]
    pub const fn buffer_index(self) -> usize {
        match self {
            Self::WriteRead => 0,
            Self::ReadOnly => 2,
        }
    }

    /// Whether mutations are permitted in this mode.
    #[inline]
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::WriteRead)
    }
}

/// Index-addressable storage a buffer copy can live in.
///
/// Reads past the end yield `T::default()`, writes past the end grow the
/// sequence.
pub trait Sequence<T> {
    /// Creates an empty sequence sized by `config`.
    fn from_config(config: &StorageConfig) -> Self
    where
        Self: Sized;

    /// Number of addressable elements currently backed by storage.
    fn len(&self) -> usize;

    /// Whether no storage is backed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`, or the default value past the end.
    fn get(&self, index: usize) -> T;

    /// Borrowed value at `index`, `None` past the end.
    fn get_ref(&self, index: usize) -> Option<&T>;

    /// Writes `value` at `index`, growing as needed.
    fn set(&mut self, index: usize, value: T);

    /// Releases storage above `index` (granularity depends on the backing).
    fn shrink_to(&mut self, index: usize);

    /// Moves `len` elements from `src` to `dst` with `memmove` semantics.
    fn copy_range(&mut self, src: usize, len: usize, dst: usize);

    /// Overwrites every backed element with `value`.
    fn fill(&mut self, value: &T);
}

/// Writer-side publication step.
pub trait CommitWrite {
    /// Publishes the writer's dirty state to the shared copy.
    ///
    /// Returns the number of entries transferred.
    fn commit_write(&mut self) -> usize;
}

/// Reader-side publication step.
pub trait CommitRead {
    /// Pulls the latest published state into the reader's snapshot.
    ///
    /// Returns the number of entries transferred.
    fn commit_read(&mut self) -> usize;
}

/// Frame lock shared by the halves of a structure built from several
/// buffers.
///
/// A writer holds it across the commits of every part and a reader across
/// the pulls, so a reader's snapshot is always one whole writer frame.
/// Lock order is gate first, then the parts' own locks.
#[derive(Clone, Default)]
pub(crate) struct CommitGate(Arc<Mutex<()>>);

impl CommitGate {
    /// Blocks until the other half is outside its commit.
    pub(crate) fn enter(&self) -> MutexGuard<'_, ()> {
        self.0.lock()
    }
}

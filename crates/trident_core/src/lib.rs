//! # TRIDENT Core
//!
//! Storage primitives for engines that run one writer thread and one reader
//! thread over the same data:
//! - Paged arrays that grow without copying payload
//! - Triple buffers that publish only what changed
//! - Name ↔ id registries with insertion order and id recycling
//! - Complete binary search trees embedded in arrays
//!
//! ## Architecture Rules
//!
//! 1. **Growth never moves payload** - Pages are allocated, never resized
//! 2. **Commit cost follows the dirty count** - Never the sequence length
//! 3. **`ReadOnly` never mutates** - Mutating calls become silent no-ops
//!
//! ## Frame Protocol
//!
//! The writer calls `commit_write` at the end of each of its cycles, the
//! reader calls `commit_read` at the start of each of its cycles. A write is
//! visible to the reader after both, in that order.
//!
//! ## Example
//!
//! ```rust
//! use trident_core::{NameBuffer, TransactionMode::{ReadOnly, WriteRead}};
//!
//! let mut names = NameBuffer::new(64, 47);
//! let id = names.add_name(WriteRead, "player").unwrap();
//!
//! names.commit_write();
//! names.commit_read();
//! assert_eq!(names.name_of(ReadOnly, id), Ok("player"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod registry;
pub mod tree;

/// "No link" / "no slot" sentinel for index links. Index 0 is valid data.
pub const NIL: usize = usize::MAX;

pub use buffer::{
    BufferReader, BufferWriter, CommitRead, CommitWrite, DualTripleBuffer, FlatArray,
    PagedArray, Sequence, TransactionMode, TripleBuffer, ValueBuffer,
};
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use registry::{NameBuffer, NamedBuffer, NamedRegistry};
pub use tree::{BufferedBinarySearchTree, CompleteBinarySearchTree, TreeEntry, TreeShape};

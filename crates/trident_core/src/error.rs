//! # Storage Error Types
//!
//! All errors that can occur in the storage core.
//!
//! Absence is reported two ways: the `try_*` and `contains*` accessors
//! return `Option`/`bool`, the strict accessors (`get`, `name_of`, `rename`,
//! `pop_*`) return one of these variants. `ReadOnly` mutations never error.

use thiserror::Error;

/// Errors that can occur in the storage core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No live entry is associated with the requested id.
    #[error("no entry with id {0}")]
    IdNotFound(usize),

    /// No live entry is associated with the requested name.
    #[error("no entry named {0:?}")]
    NameNotFound(String),

    /// No live entry holds the requested value.
    #[error("no entry holds the requested value")]
    ValueNotFound,

    /// The id lies outside the allocated capacity (never allocated, as opposed
    /// to allocated and since removed).
    #[error("id {id} out of range: capacity {capacity}")]
    IdOutOfRange {
        /// The id that was requested.
        id: usize,
        /// Current capacity of the registry.
        capacity: usize,
    },

    /// Rename target already belongs to a different entry.
    #[error("name {name:?} already belongs to id {owner}")]
    DuplicateName {
        /// The contested name.
        name: String,
        /// Id currently holding the name.
        owner: usize,
    },

    /// Invalid configuration file or parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StorageError {
    /// Whether this error reports a missing entry (any flavour).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IdNotFound(_) | Self::NameNotFound(_) | Self::ValueNotFound
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

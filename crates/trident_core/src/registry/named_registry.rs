//! # Named Registry
//!
//! Single-owner name ↔ id map over contiguous arrays.

use crate::buffer::FlatArray;
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::registry::chain::{self, IdAllocator, RegistryStore, RegistryView};
use crate::registry::{ListHeader, NameEntry};
use crate::NIL;

/// Hash-indexed, insertion-ordered registry of named values.
///
/// ## Usage
///
/// ```rust
/// use trident_core::NamedRegistry;
///
/// let mut systems: NamedRegistry<u32> = NamedRegistry::new(64, 47);
/// let physics = systems.add("physics", 60);
/// systems.add("render", 144);
///
/// assert_eq!(systems.get_by_name("physics"), Ok(&60));
/// assert_eq!(systems.name_of(physics).unwrap(), "physics");
///
/// let order: Vec<&str> = systems.iter().map(|(_, name, _)| name).collect();
/// assert_eq!(order, ["physics", "render"]);
/// ```
#[derive(Clone, Debug)]
pub struct NamedRegistry<V> {
    entries: FlatArray<NameEntry>,
    values: FlatArray<V>,
    bucket_heads: Vec<usize>,
    bucket_tails: Vec<usize>,
    order_tail: usize,
    header: ListHeader,
    ids: IdAllocator,
}

impl<V: Clone + Default> NamedRegistry<V> {
    /// Creates an empty registry.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Ids available before the first automatic expand
    /// * `hash_size` - Number of hash buckets (a prime spreads names best)
    ///
    /// # Panics
    ///
    /// Panics if `hash_size` is zero.
    #[must_use]
    pub fn new(capacity: usize, hash_size: usize) -> Self {
        assert!(hash_size > 0, "hash_size must be at least 1");
        Self {
            entries: FlatArray::new(capacity),
            values: FlatArray::new(capacity),
            bucket_heads: vec![NIL; hash_size],
            bucket_tails: vec![NIL; hash_size],
            order_tail: NIL,
            header: ListHeader::empty(capacity),
            ids: IdAllocator::default(),
        }
    }

    /// Creates an empty registry sized by `config`.
    #[must_use]
    pub fn with_config(config: &StorageConfig) -> Self {
        Self::new(config.initial_capacity, config.hash_size)
    }

    /// Inserts `name` with `value`, or replaces the value of an existing
    /// name. Returns the name's id, which is stable across updates.
    ///
    /// Doubles the capacity when every id below it is in use.
    pub fn add(&mut self, name: &str, value: V) -> usize {
        chain::add(self, name, value)
    }

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
            .and_then(|id| self.values.get_ref(id))
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

    /// Renames a live id in place; its id and insertion position are kept.
    ///
    /// # Errors
    ///
    /// [`StorageError::IdOutOfRange`] or [`StorageError::IdNotFound`] for a
    /// bad id, [`StorageError::DuplicateName`] if another id holds
    /// `new_name`. Nothing changes on error.
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

    /// Iterates live entries as `(id, name, value)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &V)> + '_ {
        chain::iter(self)
    }

    /// Raises capacity to `capacity`. Smaller values are ignored.
    pub fn expand(&mut self, capacity: usize) {
        chain::expand(self, capacity);
    }

    /// Lowers capacity toward `capacity`, never below the highest live id.
    /// Freed ids above the new top are forgotten.
    pub fn constrict(&mut self, capacity: usize) {
        chain::constrict(self, capacity);
    }

    /// Removes every entry; capacity is kept.
    pub fn clear(&mut self) {
        chain::clear(self);
    }

    /// Number of live entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.count
    }

    /// Whether no entry is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Current id capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.header.capacity
    }

    /// Number of hash buckets.
    #[inline]
    #[must_use]
    pub fn hash_size(&self) -> usize {
        self.bucket_heads.len()
    }
}

impl<V: Clone + Default + PartialEq> NamedRegistry<V> {
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

    /// Removes the oldest entry holding `value`. Returns `false` if none does.
    pub fn remove_value(&mut self, value: &V) -> bool {
        match self.id_of_value(value) {
            Some(id) => self.remove_id(id),
            None => false,
        }
    }

    /// Removes the oldest entry holding `value` and returns the stored value.
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

impl<V: Clone + Default> Default for NamedRegistry<V> {
    fn default() -> Self {
        Self::with_config(&StorageConfig::default())
    }
}

impl<V: Clone + Default> RegistryView for NamedRegistry<V> {
    type Value = V;

    fn hash_size(&self) -> usize {
        self.bucket_heads.len()
    }

    fn header(&self) -> ListHeader {
        self.header
    }

    fn bucket_head(&self, bucket: usize) -> usize {
        self.bucket_heads[bucket]
    }

    fn entry(&self, id: usize) -> Option<&NameEntry> {
        self.entries.get_ref(id)
    }

    fn value(&self, id: usize) -> Option<&V> {
        self.values.get_ref(id)
    }
}

impl<V: Clone + Default> RegistryStore for NamedRegistry<V> {
    fn set_header(&mut self, header: ListHeader) {
        self.header = header;
    }

    fn set_bucket_head(&mut self, bucket: usize, id: usize) {
        self.bucket_heads[bucket] = id;
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
        self.entries.set(id, entry);
    }

    fn edit_entry<F: FnOnce(&mut NameEntry)>(&mut self, id: usize, edit: F) {
        if let Some(entry) = self.entries.get_mut(id) {
            edit(entry);
        }
    }

    fn write_value(&mut self, id: usize, value: V) {
        self.values.set(id, value);
    }

    fn take_value(&mut self, id: usize) -> V {
        self.values.get_mut(id).map(std::mem::take).unwrap_or_default()
    }

    fn ids(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    fn reallocate(&mut self, capacity: usize) {
        self.entries.reallocate(capacity);
        self.values.reallocate(capacity);
    }
}

//! Chain maintenance shared by both registry variants.
//!
//! Reads go through [`RegistryView`], writes through [`RegistryStore`]; each
//! registry implements them over its own tables, so hashing, linking, id
//! recycling and iteration are written once.

use std::collections::VecDeque;

use crate::error::{StorageError, StorageResult};
use crate::registry::{bucket_of, ListHeader, NameEntry};
use crate::NIL;

/// Read access to one copy of a registry's tables.
pub(crate) trait RegistryView {
    type Value;

    fn hash_size(&self) -> usize;
    fn header(&self) -> ListHeader;
    fn bucket_head(&self, bucket: usize) -> usize;
    fn entry(&self, id: usize) -> Option<&NameEntry>;
    fn value(&self, id: usize) -> Option<&Self::Value>;
}

/// Write access to the writer's copy of a registry's tables.
pub(crate) trait RegistryStore: RegistryView {
    fn set_header(&mut self, header: ListHeader);
    fn set_bucket_head(&mut self, bucket: usize, id: usize);
    fn bucket_tail(&self, bucket: usize) -> usize;
    fn set_bucket_tail(&mut self, bucket: usize, id: usize);
    fn order_tail(&self) -> usize;
    fn set_order_tail(&mut self, id: usize);
    fn write_entry(&mut self, id: usize, entry: NameEntry);
    fn edit_entry<F: FnOnce(&mut NameEntry)>(&mut self, id: usize, edit: F);
    fn write_value(&mut self, id: usize, value: Self::Value);
    fn take_value(&mut self, id: usize) -> Self::Value;
    fn ids(&mut self) -> &mut IdAllocator;
    /// Resizes backing storage only; the header is updated by the caller.
    fn reallocate(&mut self, capacity: usize);
}

// =============================================================================
// ID ALLOCATION
// =============================================================================

/// Dense id allocation with FIFO reuse of freed ids.
///
/// Ids live in `[0, top)`; freed ids wait in `free` and are handed out again,
/// oldest first, before `top` grows.
#[derive(Clone, Debug, Default)]
pub(crate) struct IdAllocator {
    free: VecDeque<usize>,
    top: usize,
}

impl IdAllocator {
    pub fn allocate(&mut self) -> usize {
        if let Some(id) = self.free.pop_front() {
            return id;
        }
        self.top += 1;
        self.top - 1
    }

    pub fn release(&mut self, id: usize) {
        if id + 1 == self.top {
            self.top -= 1;
        } else {
            self.free.push_back(id);
        }
    }

    /// Lowers `top` past trailing freed ids and forgets them.
    pub fn trim(&mut self) {
        while self.top > 0 && self.free.contains(&(self.top - 1)) {
            self.top -= 1;
        }
        let top = self.top;
        self.free.retain(|&id| id < top);
    }

    pub fn clear(&mut self) {
        self.free.clear();
        self.top = 0;
    }

    pub fn top(&self) -> usize {
        self.top
    }
}

// =============================================================================
// READS
// =============================================================================

pub(crate) fn find_name<R: RegistryView>(view: &R, name: &str) -> Option<usize> {
    let mut cursor = view.bucket_head(bucket_of(name, view.hash_size()));
    while cursor != NIL {
        let entry = view.entry(cursor).filter(|entry| entry.id == cursor)?;
        if entry.name == name {
            return Some(cursor);
        }
        cursor = entry.hash_next;
    }
    None
}

pub(crate) fn is_live<R: RegistryView>(view: &R, id: usize) -> bool {
    view.entry(id).is_some_and(|entry| entry.id == id)
}

/// Live entry for `id`, distinguishing never-allocated from freed.
pub(crate) fn live_entry<R: RegistryView>(view: &R, id: usize) -> StorageResult<&NameEntry> {
    let capacity = view.header().capacity;
    if id >= capacity {
        return Err(StorageError::IdOutOfRange { id, capacity });
    }
    view.entry(id)
        .filter(|entry| entry.id == id)
        .ok_or(StorageError::IdNotFound(id))
}

pub(crate) fn value_of<R: RegistryView>(view: &R, id: usize) -> StorageResult<&R::Value> {
    live_entry(view, id)?;
    view.value(id).ok_or(StorageError::IdNotFound(id))
}

pub(crate) fn find_value<R>(view: &R, value: &R::Value) -> Option<usize>
where
    R: RegistryView,
    R::Value: PartialEq,
{
    iter(view).find(|(_, _, v)| *v == value).map(|(id, _, _)| id)
}

/// Live entries in insertion order.
pub(crate) struct OrderIter<'a, R> {
    view: &'a R,
    cursor: usize,
}

impl<'a, R: RegistryView> Iterator for OrderIter<'a, R> {
    type Item = (usize, &'a str, &'a R::Value);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let id = self.cursor;
        let entry = self.view.entry(id).filter(|entry| entry.id == id)?;
        let value = self.view.value(id)?;
        self.cursor = entry.order_next;
        Some((id, entry.name.as_str(), value))
    }
}

pub(crate) fn iter<R: RegistryView>(view: &R) -> OrderIter<'_, R> {
    OrderIter {
        view,
        cursor: view.header().order_head,
    }
}

// =============================================================================
// WRITES
// =============================================================================

/// Inserts `name` or, if present, replaces its value. Returns the id.
pub(crate) fn add<S: RegistryStore>(store: &mut S, name: &str, value: S::Value) -> usize {
    if let Some(id) = find_name(store, name) {
        store.write_value(id, value);
        return id;
    }

    let id = store.ids().allocate();
    let capacity = store.header().capacity;
    if id >= capacity {
        expand(store, (capacity * 2).max(id + 1));
    }

    let bucket = bucket_of(name, store.hash_size());
    let hash_tail = store.bucket_tail(bucket);
    let order_tail = store.order_tail();
    store.write_entry(
        id,
        NameEntry {
            id,
            name: name.to_owned(),
            hash_prev: hash_tail,
            hash_next: NIL,
            order_prev: order_tail,
            order_next: NIL,
        },
    );
    store.write_value(id, value);

    if hash_tail == NIL {
        store.set_bucket_head(bucket, id);
    } else {
        store.edit_entry(hash_tail, |entry| entry.hash_next = id);
    }
    store.set_bucket_tail(bucket, id);

    let mut header = store.header();
    if order_tail == NIL {
        header.order_head = id;
    } else {
        store.edit_entry(order_tail, |entry| entry.order_next = id);
    }
    store.set_order_tail(id);
    header.count += 1;
    store.set_header(header);
    id
}

fn unlink_hash<S: RegistryStore>(store: &mut S, bucket: usize, prev: usize, next: usize) {
    if next == NIL {
        store.set_bucket_tail(bucket, prev);
    } else {
        store.edit_entry(next, |entry| entry.hash_prev = prev);
    }
    if prev == NIL {
        store.set_bucket_head(bucket, next);
    } else {
        store.edit_entry(prev, |entry| entry.hash_next = next);
    }
}

fn append_hash<S: RegistryStore>(store: &mut S, bucket: usize, id: usize) {
    let tail = store.bucket_tail(bucket);
    store.edit_entry(id, |entry| {
        entry.hash_prev = tail;
        entry.hash_next = NIL;
    });
    if tail == NIL {
        store.set_bucket_head(bucket, id);
    } else {
        store.edit_entry(tail, |entry| entry.hash_next = id);
    }
    store.set_bucket_tail(bucket, id);
}

/// Unlinks a live id and returns its value; `None` if `id` is not live.
pub(crate) fn remove<S: RegistryStore>(store: &mut S, id: usize) -> Option<S::Value> {
    let entry = store.entry(id).filter(|entry| entry.id == id)?;
    let bucket = bucket_of(&entry.name, store.hash_size());
    let (hash_prev, hash_next) = (entry.hash_prev, entry.hash_next);
    let (order_prev, order_next) = (entry.order_prev, entry.order_next);

    unlink_hash(store, bucket, hash_prev, hash_next);

    let mut header = store.header();
    if order_next == NIL {
        store.set_order_tail(order_prev);
    } else {
        store.edit_entry(order_next, |entry| entry.order_prev = order_prev);
    }
    if order_prev == NIL {
        header.order_head = order_next;
    } else {
        store.edit_entry(order_prev, |entry| entry.order_next = order_next);
    }

    store.write_entry(id, NameEntry::default());
    let value = store.take_value(id);
    store.ids().release(id);
    header.count -= 1;
    store.set_header(header);
    Some(value)
}

/// Gives a live id a new name, keeping its id and insertion position.
pub(crate) fn rename<S: RegistryStore>(store: &mut S, id: usize, new_name: &str) -> StorageResult<()> {
    let entry = live_entry(store, id)?;
    if entry.name == new_name {
        return Ok(());
    }
    let old_bucket = bucket_of(&entry.name, store.hash_size());
    let (prev, next) = (entry.hash_prev, entry.hash_next);
    if let Some(owner) = find_name(store, new_name) {
        return Err(StorageError::DuplicateName {
            name: new_name.to_owned(),
            owner,
        });
    }

    unlink_hash(store, old_bucket, prev, next);
    store.edit_entry(id, |entry| entry.name = new_name.to_owned());
    append_hash(store, bucket_of(new_name, store.hash_size()), id);
    Ok(())
}

/// Renames the entry holding `name`; returns its id.
pub(crate) fn rename_name<S: RegistryStore>(
    store: &mut S,
    name: &str,
    new_name: &str,
) -> StorageResult<usize> {
    let id = find_name(store, name).ok_or_else(|| StorageError::NameNotFound(name.to_owned()))?;
    rename(store, id, new_name)?;
    Ok(id)
}

/// Grows capacity to `capacity`; smaller requests are ignored.
pub(crate) fn expand<S: RegistryStore>(store: &mut S, capacity: usize) {
    let mut header = store.header();
    if capacity <= header.capacity {
        return;
    }
    store.reallocate(capacity);
    tracing::debug!(from = header.capacity, to = capacity, "registry expanded");
    header.capacity = capacity;
    store.set_header(header);
}

/// Shrinks capacity toward `capacity`, never below the highest live id.
pub(crate) fn constrict<S: RegistryStore>(store: &mut S, capacity: usize) {
    store.ids().trim();
    let capacity = capacity.max(store.ids().top());
    let mut header = store.header();
    if capacity >= header.capacity {
        return;
    }
    store.reallocate(capacity);
    tracing::debug!(from = header.capacity, to = capacity, "registry constricted");
    header.capacity = capacity;
    store.set_header(header);
}

/// Frees every entry and empties every chain.
pub(crate) fn clear<S: RegistryStore>(store: &mut S) {
    let live: Vec<usize> = iter(store).map(|(id, _, _)| id).collect();
    for id in live {
        store.write_entry(id, NameEntry::default());
        store.take_value(id);
    }
    for bucket in 0..store.hash_size() {
        store.set_bucket_head(bucket, NIL);
        store.set_bucket_tail(bucket, NIL);
    }
    store.set_order_tail(NIL);
    store.ids().clear();
    let capacity = store.header().capacity;
    store.set_header(ListHeader::empty(capacity));
}

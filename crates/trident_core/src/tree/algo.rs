//! Insert, remove and traversal shared by both tree variants.

use std::cmp::Ordering;

use crate::tree::walk::{frame_len, index_at, step, walk_index};
use crate::tree::{TreeEntry, TreeShape};
use crate::NIL;

/// Read access to one copy of a tree.
pub(crate) trait TreeView {
    type Value;

    fn shape(&self) -> TreeShape;
    fn slot(&self, index: usize) -> Option<&TreeEntry<Self::Value>>;
}

/// Write access to the writer's copy of a tree.
pub(crate) trait TreeStore: TreeView {
    fn set_shape(&mut self, shape: TreeShape);
    fn put(&mut self, index: usize, entry: TreeEntry<Self::Value>);
    /// Empties a slot and returns what it held.
    fn take(&mut self, index: usize) -> TreeEntry<Self::Value>;
}

/// Outcome of a root-to-leaf descent.
enum Descent {
    Found(usize),
    /// Key absent; `pred`/`succ` are the slots of its in-order neighbours.
    Vacant { pred: usize, succ: usize },
}

fn descend<R: TreeView>(view: &R, key: i64) -> Descent {
    let count = view.shape().count;
    let (mut pred, mut succ) = (NIL, NIL);
    let mut index = 0;
    while index < count {
        let Some(entry) = view.slot(index).filter(|entry| !entry.is_empty()) else {
            break;
        };
        match key.cmp(&entry.key) {
            Ordering::Equal => return Descent::Found(index),
            Ordering::Less => {
                succ = index;
                index = 2 * index + 1;
            }
            Ordering::Greater => {
                pred = index;
                index = 2 * index + 2;
            }
        }
    }
    Descent::Vacant { pred, succ }
}

pub(crate) fn find<R: TreeView>(view: &R, key: i64) -> Option<&TreeEntry<R::Value>> {
    match descend(view, key) {
        Descent::Found(index) => view.slot(index),
        Descent::Vacant { .. } => None,
    }
}

fn move_entry<S: TreeStore>(store: &mut S, from: usize, to: usize) {
    let mut entry = store.take(from);
    entry.index = to;
    store.put(to, entry);
}

/// Fills `hole` from its walk-order neighbour, then that neighbour's slot
/// from the next one, until the slot `stop` has been emptied.
fn shift_into<S: TreeStore>(store: &mut S, hole: usize, stop: usize, depth: u32, top: usize, forward: bool) {
    let mut cursor = hole;
    while let Some(from) = step(cursor, depth, top, forward) {
        move_entry(store, from, cursor);
        cursor = from;
        if from == stop {
            break;
        }
    }
}

/// Inserts `key`; returns `false` and changes nothing if it is present.
pub(crate) fn insert<S: TreeStore>(store: &mut S, key: i64, value: S::Value) -> bool {
    let (pred, succ) = match descend(store, key) {
        Descent::Found(_) => return false,
        Descent::Vacant { pred, succ } => (pred, succ),
    };

    let mut shape = store.shape();
    let slot = shape.count;
    let depth = crate::tree::walk::layer(slot);
    let slot_walk = walk_index(slot, depth);

    let target = if succ != NIL && walk_index(succ, depth) < slot_walk {
        shift_into(store, slot, succ, depth, slot, false);
        succ
    } else if pred != NIL && walk_index(pred, depth) > slot_walk {
        shift_into(store, slot, pred, depth, slot, true);
        pred
    } else {
        slot
    };

    store.put(
        target,
        TreeEntry {
            index: target,
            key,
            value,
        },
    );
    shape.grow();
    store.set_shape(shape);
    true
}

/// Inserts `key` or replaces its value.
pub(crate) fn upsert<S: TreeStore>(store: &mut S, key: i64, value: S::Value) {
    match descend(store, key) {
        Descent::Found(index) => {
            let mut entry = store.take(index);
            entry.value = value;
            store.put(index, entry);
        }
        Descent::Vacant { .. } => {
            insert(store, key, value);
        }
    }
}

/// Removes `key` and returns its value; `None` if absent.
pub(crate) fn remove<S: TreeStore>(store: &mut S, key: i64) -> Option<S::Value> {
    let Descent::Found(index) = descend(store, key) else {
        return None;
    };

    let mut shape = store.shape();
    let last = shape.count - 1;
    let removed = store.take(index);
    if index != last {
        let depth = shape.depth();
        let forward = walk_index(index, depth) < walk_index(last, depth);
        shift_into(store, index, last, depth, last, forward);
    }
    shape.shrink();
    store.set_shape(shape);
    Some(removed.value)
}

pub(crate) fn clear<S: TreeStore>(store: &mut S) {
    for index in 0..store.shape().count {
        store.take(index);
    }
    store.set_shape(TreeShape::EMPTY);
}

/// Entries in ascending key order.
pub(crate) struct WalkIter<'a, R> {
    view: &'a R,
    walk: usize,
    end: usize,
    depth: u32,
    count: usize,
}

impl<'a, R: TreeView> Iterator for WalkIter<'a, R> {
    type Item = &'a TreeEntry<R::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.walk < self.end {
            let index = index_at(self.walk, self.depth);
            self.walk += 1;
            if index < self.count {
                if let Some(entry) = self.view.slot(index).filter(|e| !e.is_empty()) {
                    return Some(entry);
                }
            }
        }
        None
    }
}

pub(crate) fn iter<R: TreeView>(view: &R) -> WalkIter<'_, R> {
    let shape = view.shape();
    let depth = shape.depth();
    WalkIter {
        view,
        walk: 0,
        end: if shape.count == 0 { 0 } else { frame_len(depth) },
        depth,
        count: shape.count,
    }
}

/// Checks both tree invariants; used by tests.
#[cfg(test)]
pub(crate) fn assert_invariants<R: TreeView>(view: &R) {
    let shape = view.shape();
    for index in 0..shape.count {
        let entry = view.slot(index).expect("occupied slot backed");
        assert_eq!(entry.index, index, "slot {index} holds a foreign index");
        for (child, smaller) in [(2 * index + 1, true), (2 * index + 2, false)] {
            if child < shape.count {
                let child_key = view.slot(child).expect("child backed").key;
                assert_eq!(child_key < entry.key, smaller, "order broken at {index}->{child}");
            }
        }
    }
    if let Some(entry) = view.slot(shape.count) {
        assert!(entry.is_empty(), "slot past count is occupied");
    }
    let keys: Vec<i64> = iter(view).map(|e| e.key).collect();
    assert_eq!(keys.len(), shape.count);
    assert!(keys.windows(2).all(|w| w[0] < w[1]), "walk order not ascending");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A copy whose shape and slots came from different writer frames.
    struct TornView {
        shape: TreeShape,
        slots: Vec<TreeEntry<u8>>,
    }

    impl TreeView for TornView {
        type Value = u8;

        fn shape(&self) -> TreeShape {
            self.shape
        }

        fn slot(&self, index: usize) -> Option<&TreeEntry<u8>> {
            self.slots.get(index)
        }
    }

    fn shape_of(count: usize) -> TreeShape {
        let mut shape = TreeShape::EMPTY;
        for _ in 0..count {
            shape.grow();
        }
        shape
    }

    #[test]
    fn test_empty_slot_under_stale_count_is_not_a_match() {
        let view = TornView {
            shape: shape_of(1),
            slots: vec![TreeEntry::default()],
        };
        assert!(find(&view, 0).is_none());
        assert_eq!(iter(&view).count(), 0);
    }

    #[test]
    fn test_descent_stops_at_emptied_child() {
        let mut slots = vec![TreeEntry::default(); 3];
        slots[0] = TreeEntry { index: 0, key: 5, value: 1 };
        slots[1] = TreeEntry { index: 1, key: 2, value: 2 };
        let view = TornView {
            shape: shape_of(3),
            slots,
        };
        assert_eq!(find(&view, 2).map(|e| e.value), Some(2));
        assert!(find(&view, 0).is_none());
        assert!(find(&view, 7).is_none());
    }
}

//! Walk-index arithmetic for array-embedded binary trees.
//!
//! A node at array index `i` sits on layer `l = floor(log2(i + 1))` at offset
//! `o = i + 1 - 2^l`. Inside a perfect frame of depth `D`, its in-order
//! position ("walk index") is
//!
//! ```text
//! walk(i, D) = ((2o + 1) << (D - l)) - 1
//! ```
//!
//! and the inverse reads the layer off the trailing one-bits of the walk
//! index. Walking indices in increasing walk order visits keys in ascending
//! order.

/// Layer holding array index `index` (the root is layer 0).
#[inline]
#[must_use]
pub const fn layer(index: usize) -> u32 {
    (index + 1).ilog2()
}

/// First array index of `layer`.
#[inline]
#[must_use]
pub const fn layer_start(layer: u32) -> usize {
    (1 << layer) - 1
}

/// Number of positions in a perfect frame of depth `depth`.
#[inline]
#[must_use]
pub const fn frame_len(depth: u32) -> usize {
    (1 << (depth + 1)) - 1
}

/// In-order position of `index` inside a frame of depth `depth`.
///
/// `index` must lie in the frame (`layer(index) <= depth`).
#[inline]
#[must_use]
pub const fn walk_index(index: usize, depth: u32) -> usize {
    let l = layer(index);
    let offset = index - layer_start(l);
    ((2 * offset + 1) << (depth - l)) - 1
}

/// Array index at in-order position `walk` of a frame of depth `depth`.
#[inline]
#[must_use]
pub const fn index_at(walk: usize, depth: u32) -> usize {
    let t = walk.trailing_ones();
    let l = depth - t;
    layer_start(l) + ((walk + 1) >> (t + 1))
}

/// Next (or previous) occupied index in walk order, where exactly the
/// indices `0..=top` are occupied.
#[must_use]
pub fn step(index: usize, depth: u32, top: usize, forward: bool) -> Option<usize> {
    let end = frame_len(depth);
    let mut walk = walk_index(index, depth);
    loop {
        walk = if forward {
            walk + 1
        } else {
            walk.checked_sub(1)?
        };
        if walk >= end {
            return None;
        }
        let candidate = index_at(walk, depth);
        if candidate <= top {
            return Some(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers() {
        assert_eq!(layer(0), 0);
        assert_eq!(layer(1), 1);
        assert_eq!(layer(2), 1);
        assert_eq!(layer(3), 2);
        assert_eq!(layer(6), 2);
        assert_eq!(layer(7), 3);
        assert_eq!(layer_start(3), 7);
    }

    #[test]
    fn test_walk_of_small_frame() {
        // Frame of depth 2: in-order is 3 1 4 0 5 2 6.
        let order: Vec<usize> = (0..frame_len(2)).map(|w| index_at(w, 2)).collect();
        assert_eq!(order, vec![3, 1, 4, 0, 5, 2, 6]);
        for (w, index) in order.into_iter().enumerate() {
            assert_eq!(walk_index(index, 2), w);
        }
    }

    #[test]
    fn test_walk_round_trip_deep_frame() {
        let depth = 9;
        for index in 0..frame_len(depth) {
            assert_eq!(index_at(walk_index(index, depth), depth), index);
        }
    }

    #[test]
    fn test_step_skips_unoccupied_leaves() {
        // Occupied 0..=4 in a depth-2 frame: walk order 3 1 4 0 2.
        assert_eq!(step(3, 2, 4, true), Some(1));
        assert_eq!(step(4, 2, 4, true), Some(0));
        assert_eq!(step(0, 2, 4, true), Some(2));
        assert_eq!(step(2, 2, 4, true), None);
        assert_eq!(step(2, 2, 4, false), Some(0));
        assert_eq!(step(3, 2, 4, false), None);
    }
}

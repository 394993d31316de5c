//! # Tree Verification Tests
//!
//! After any interleaving of inserts and removes on random keys:
//!
//! 1. **Order**: iteration yields strictly ascending keys
//! 2. **Completeness**: occupied slots are exactly `0..len`, and every
//!    entry records its own slot
//! 3. **Membership**: `find` succeeds exactly for live keys
//!
//! A `BTreeMap` serves as the oracle.
//!
//! Run with: cargo test --test tree_verification

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use trident_core::{
    BufferedBinarySearchTree, CompleteBinarySearchTree,
    TransactionMode::{ReadOnly, WriteRead},
};

fn check_against_oracle(tree: &CompleteBinarySearchTree<i64>, oracle: &BTreeMap<i64, i64>) {
    let entries: Vec<(usize, i64, i64)> = tree.iter().map(|e| (e.index, e.key, e.value)).collect();
    let expected: Vec<(i64, i64)> = oracle.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(
        entries.iter().map(|(_, k, v)| (*k, *v)).collect::<Vec<_>>(),
        expected
    );

    let mut slots: Vec<usize> = entries.iter().map(|(index, _, _)| *index).collect();
    slots.sort_unstable();
    assert_eq!(slots, (0..oracle.len()).collect::<Vec<_>>(), "tree is not complete");

    let shape = tree.shape();
    assert_eq!(shape.count, oracle.len());
    if !oracle.is_empty() {
        assert_eq!(shape.top, oracle.len() - 1);
        assert_eq!(shape.top_continuous, shape.top);
    }
}

// ============================================================================
// CONCRETE SCENARIO
// ============================================================================

#[test]
fn verify_sorted_prefix_after_each_insert() {
    let mut tree: CompleteBinarySearchTree<()> = CompleteBinarySearchTree::new(4, 1);
    let mut inserted = Vec::new();

    for key in [50, 20, 80, 10, 30] {
        assert!(tree.add(key, ()));
        inserted.push(key);
        inserted.sort_unstable();
        assert_eq!(tree.keys().collect::<Vec<_>>(), inserted);
    }

    assert_eq!(tree.remove(20), Some(()));
    assert!(tree.find(20).is_none());
    assert!(tree.find(50).is_some());
    assert!(tree.find(80).is_some());
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.keys().collect::<Vec<_>>(), [10, 30, 50, 80]);

    let mut slots: Vec<usize> = tree.iter().map(|e| e.index).collect();
    slots.sort_unstable();
    assert_eq!(slots, [0, 1, 2, 3]);
}

// ============================================================================
// FUZZING
// ============================================================================

#[test]
fn verify_invariants_under_random_operations() {
    for seed in 0..8u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(0x7ee0_0000 + seed);
        let mut tree: CompleteBinarySearchTree<i64> = CompleteBinarySearchTree::new(3, 1);
        let mut oracle = BTreeMap::new();

        for step in 0..600 {
            let key = rng.gen_range(-200..200);
            if rng.gen_bool(0.6) {
                let value = rng.gen_range(0..1_000_000);
                let inserted = tree.add(key, value);
                assert_eq!(inserted, !oracle.contains_key(&key), "seed {seed} step {step}");
                oracle.entry(key).or_insert(value);
            } else {
                assert_eq!(tree.remove(key), oracle.remove(&key), "seed {seed} step {step}");
            }
            check_against_oracle(&tree, &oracle);
        }

        for key in -210..210 {
            assert_eq!(tree.get(key), oracle.get(&key));
        }
    }
}

#[test]
fn verify_set_and_drain() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x7ee0_1000);
    let mut tree: CompleteBinarySearchTree<i64> = CompleteBinarySearchTree::default();
    let mut oracle = BTreeMap::new();

    for _ in 0..400 {
        let key = rng.gen_range(0..120);
        let value = rng.gen();
        tree.set(key, value);
        oracle.insert(key, value);
    }
    check_against_oracle(&tree, &oracle);

    let keys: Vec<i64> = oracle.keys().copied().collect();
    for key in keys {
        assert_eq!(tree.remove(key), oracle.remove(&key));
        check_against_oracle(&tree, &oracle);
    }
    assert!(tree.is_empty());
}

#[test]
fn verify_buffered_tree_tracks_plain_tree() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x7ee0_2000);
    let mut plain: CompleteBinarySearchTree<i64> = CompleteBinarySearchTree::new(3, 1);
    let mut buffered: BufferedBinarySearchTree<i64> = BufferedBinarySearchTree::new(3, 1);

    for _frame in 0..80 {
        let before: Vec<i64> = buffered.keys(ReadOnly).collect();
        for _ in 0..rng.gen_range(1..10) {
            let key = rng.gen_range(0..64);
            if rng.gen_bool(0.55) {
                assert_eq!(plain.add(key, key), buffered.add(WriteRead, key, key));
            } else {
                assert_eq!(plain.remove(key), buffered.remove(WriteRead, key));
            }
        }
        assert_eq!(buffered.keys(ReadOnly).collect::<Vec<_>>(), before);

        buffered.commit_write();
        buffered.commit_read();

        let published: Vec<(usize, i64)> =
            buffered.iter(ReadOnly).map(|e| (e.index, e.key)).collect();
        let expected: Vec<(usize, i64)> = plain.iter().map(|e| (e.index, e.key)).collect();
        assert_eq!(published, expected);
        assert_eq!(buffered.shape(ReadOnly), plain.shape());
    }
}

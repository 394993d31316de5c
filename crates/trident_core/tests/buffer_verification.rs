//! # Buffer Verification Tests
//!
//! Properties of the paged array and the triple-buffer protocol:
//!
//! 1. **Visibility**: the reader sees the writer's last value per index after
//!    `commit_write` then `commit_read`, and nothing earlier
//! 2. **Coalescing**: repeated writes to one index transfer once per cycle
//! 3. **Growth**: any index can be written and read back; unwritten reads
//!    return the default
//! 4. **copy_range**: matches a flat oracle on overlapping, page-crossing
//!    ranges in both directions
//!
//! Run with: cargo test --test buffer_verification

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use trident_core::buffer::FlatArray;
use trident_core::{
    DualTripleBuffer, PagedArray, TransactionMode::{ReadOnly, WriteRead}, TripleBuffer,
};

// ============================================================================
// TRIPLE BUFFER VISIBILITY
// ============================================================================

#[test]
fn verify_write_visible_only_after_both_commits() {
    let mut buffer: TripleBuffer<i32> = TripleBuffer::new(2, 2);
    for index in 0..5 {
        buffer.set(WriteRead, index, 0);
    }
    buffer.commit_write();
    buffer.commit_read();

    buffer.set(WriteRead, 2, 7);
    assert_eq!(buffer.get(ReadOnly, 2), 0);
    assert_eq!(buffer.get(WriteRead, 2), 7);

    buffer.commit_write();
    assert_eq!(buffer.get(ReadOnly, 2), 0);
    buffer.commit_read();
    assert_eq!(buffer.get(ReadOnly, 2), 7);
}

#[test]
fn verify_reader_matches_writer_after_random_frames() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0001);
    let mut buffer: TripleBuffer<u64> = TripleBuffer::new(4, 1);
    let mut published: HashMap<usize, u64> = HashMap::new();

    for _frame in 0..50 {
        let mut frame: HashMap<usize, u64> = HashMap::new();
        for _ in 0..rng.gen_range(0..40) {
            let index = rng.gen_range(0..300);
            let value = rng.gen();
            buffer.set(WriteRead, index, value);
            frame.insert(index, value);
        }

        // Nothing from this frame is visible yet.
        for index in 0..300 {
            let expected = published.get(&index).copied().unwrap_or_default();
            assert_eq!(buffer.get(ReadOnly, index), expected);
        }

        let transferred = buffer.commit_write();
        assert_eq!(transferred, frame.len());
        assert_eq!(buffer.commit_read(), frame.len());

        published.extend(frame);
        for index in 0..300 {
            let expected = published.get(&index).copied().unwrap_or_default();
            assert_eq!(buffer.get(ReadOnly, index), expected, "index {index}");
        }
    }
}

#[test]
fn verify_repeated_writes_transfer_once() {
    let mut buffer: TripleBuffer<u32> = TripleBuffer::new(3, 1);
    for value in 0..10 {
        buffer.set(WriteRead, 3, value);
    }
    buffer.set(WriteRead, 20, 1);
    assert_eq!(buffer.pending_writes(), 2);

    assert_eq!(buffer.commit_write(), 2);
    assert_eq!(buffer.pending_reads(), 2);
    assert_eq!(buffer.commit_read(), 2);
    assert_eq!(buffer.get(ReadOnly, 3), 9);

    // A second cycle with nothing dirty moves nothing.
    assert_eq!(buffer.commit_write(), 0);
    assert_eq!(buffer.commit_read(), 0);
}

#[test]
fn verify_commit_read_first_sees_previous_frame() {
    let mut buffer: TripleBuffer<u8> = TripleBuffer::new(3, 1);
    buffer.set(WriteRead, 1, 1);
    buffer.commit_write();
    buffer.set(WriteRead, 1, 2);

    buffer.commit_read();
    assert_eq!(buffer.get(ReadOnly, 1), 1);
    buffer.commit_write();
    buffer.commit_read();
    assert_eq!(buffer.get(ReadOnly, 1), 2);
}

#[test]
fn verify_dual_buffer_moves_pairs_together() {
    let mut buffer: DualTripleBuffer<u32, char> = DualTripleBuffer::new(2, 1);
    buffer.set_primary(WriteRead, 6, 60);
    buffer.set_secondary(WriteRead, 6, 'f');
    buffer.set(WriteRead, 1, 10, 'a');
    assert_eq!(buffer.pending_writes(), 2);

    buffer.commit_write();
    buffer.commit_read();
    assert_eq!(buffer.get(ReadOnly, 6), (60, 'f'));
    assert_eq!(buffer.get(ReadOnly, 1), (10, 'a'));

    buffer.set_secondary(WriteRead, 1, 'b');
    buffer.commit_write();
    buffer.commit_read();
    assert_eq!(buffer.get_primary(ReadOnly, 1), 10);
    assert_eq!(buffer.get_secondary(ReadOnly, 1), 'b');
}

#[test]
fn verify_shrink_reaches_the_reader() {
    let mut buffer: TripleBuffer<u16> = TripleBuffer::new(2, 1);
    for index in 0..16 {
        buffer.set(WriteRead, index, 1);
    }
    buffer.commit_write();
    buffer.commit_read();
    assert_eq!(buffer.len(ReadOnly), 16);

    buffer.set(WriteRead, 14, 9);
    buffer.shrink_to(5);
    assert_eq!(buffer.len(WriteRead), 8);
    buffer.commit_write();
    buffer.commit_read();

    assert_eq!(buffer.len(ReadOnly), 8);
    assert_eq!(buffer.get(ReadOnly, 14), 0);
    assert_eq!(buffer.get(ReadOnly, 5), 1);
}

// ============================================================================
// PAGED ARRAY
// ============================================================================

#[test]
fn verify_paged_growth_round_trips() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0002);
    let mut paged: PagedArray<u32> = PagedArray::new(3, 1);
    let mut written: HashMap<usize, u32> = HashMap::new();

    for _ in 0..500 {
        let index = rng.gen_range(0..5_000);
        let value = rng.gen_range(1..u32::MAX);
        paged.set(index, value);
        written.insert(index, value);
        assert_eq!(paged.get(index), value);
    }

    for index in 0..5_000 {
        assert_eq!(paged.get(index), written.get(&index).copied().unwrap_or_default());
    }
    assert_eq!(paged.len(), paged.page_count() * paged.page_size());
    assert_eq!(paged.get(1 << 30), 0);
}

#[test]
fn verify_copy_range_matches_flat_oracle() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0003);

    for _case in 0..300 {
        let mut paged: PagedArray<u32> = PagedArray::new(3, 1);
        let mut flat: FlatArray<u32> = FlatArray::new(0);
        let mut oracle: Vec<u32> = vec![0; 128];
        for (index, slot) in oracle.iter_mut().enumerate().take(rng.gen_range(1..128)) {
            let value = u32::try_from(index).unwrap_or(0) + 1;
            *slot = value;
            paged.set(index, value);
            flat.set(index, value);
        }

        let src = rng.gen_range(0..96);
        let dst = rng.gen_range(0..96);
        let len = rng.gen_range(0..32);
        paged.copy_range(src, len, dst);
        flat.copy_range(src, len, dst);
        oracle.copy_within(src..src + len, dst);

        for (index, expected) in oracle.iter().enumerate() {
            assert_eq!(paged.get(index), *expected, "paged: copy {src}->{dst} x{len} @ {index}");
            assert_eq!(flat.get(index), *expected, "flat: copy {src}->{dst} x{len} @ {index}");
        }
    }
}

#[test]
fn verify_copy_range_publishes_destination() {
    let mut buffer: TripleBuffer<u32> = TripleBuffer::new(2, 1);
    for index in 0..10 {
        buffer.set(WriteRead, index, u32::try_from(index).unwrap_or(0));
    }
    buffer.commit_write();
    buffer.commit_read();

    buffer.copy_range(WriteRead, 0, 4, 2);
    assert_eq!(buffer.pending_writes(), 4);
    buffer.commit_write();
    buffer.commit_read();

    let snapshot: Vec<u32> = (0..10).map(|i| buffer.get(ReadOnly, i)).collect();
    assert_eq!(snapshot, [0, 1, 0, 1, 2, 3, 6, 7, 8, 9]);
}

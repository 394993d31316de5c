//! # Paged Array
//!
//! A growable array made of fixed-size pages.
//!
//! ## Layout
//!
//! ```text
//! page table (Vec, doubles when full)
//!   [0] ─► [ e0   e1   ...  e255 ]
//!   [1] ─► [ e256 e257 ... e511 ]
//!   [2] ─► [ ...                 ]
//! ```
//!
//! Index `i` lives at page `i >> page_power`, offset `i & (page_size - 1)`.
//! Growing allocates new pages and never moves existing payload. Reading past
//! the end returns `T::default()` without allocating.

use crate::buffer::Sequence;
use crate::config::StorageConfig;

/// Growable array of `2^page_power`-element pages.
#[derive(Clone, Debug)]
pub struct PagedArray<T> {
    /// Materialized pages; capacity is the page-table size.
    pages: Vec<Box<[T]>>,
    /// Page size as a power of two.
    page_power: u32,
    /// `page_size - 1`.
    mask: usize,
}

impl<T: Clone + Default> PagedArray<T> {
    /// Creates a paged array with one materialized page.
    ///
    /// # Arguments
    ///
    /// * `page_power` - Page size as a power of two (8 = 256 elements)
    /// * `initial_page_count` - Page-table slots reserved up front
    ///
    /// # Panics
    ///
    /// Panics if `page_power` is zero or larger than
    /// [`MAX_PAGE_POWER`](crate::config::MAX_PAGE_POWER).
    #[must_use]
    pub fn new(page_power: u32, initial_page_count: usize) -> Self {
        assert!(
            (1..=crate::config::MAX_PAGE_POWER).contains(&page_power),
            "page_power out of range: {page_power}"
        );
        let mut pages = Vec::with_capacity(initial_page_count.max(1));
        pages.push(Self::blank_page(1 << page_power));
        Self {
            pages,
            page_power,
            mask: (1 << page_power) - 1,
        }
    }

    /// Creates a paged array sized by `config`.
    #[must_use]
    pub fn with_config(config: &StorageConfig) -> Self {
        Self::new(config.page_power, config.initial_page_count)
    }

    fn blank_page(size: usize) -> Box<[T]> {
        (0..size).map(|_| T::default()).collect()
    }

    /// Splits an index into `(page, offset)`.
    #[inline]
    #[must_use]
    pub const fn locate(&self, index: usize) -> (usize, usize) {
        (index >> self.page_power, index & self.mask)
    }

    /// Materializes pages up to and including `page`.
    fn ensure_page(&mut self, page: usize) {
        while self.pages.len() <= page {
            if self.pages.len() == self.pages.capacity() {
                let grow_by = self.pages.capacity().max(1);
                self.pages.reserve_exact(grow_by);
                tracing::trace!(
                    table_capacity = self.pages.capacity(),
                    "paged array page table doubled"
                );
            }
            self.pages.push(Self::blank_page(self.page_size()));
        }
    }

    /// Value at `index`, or the default value if no page backs it.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        self.get_ref(index).cloned().unwrap_or_default()
    }

    /// Borrowed value at `index`, `None` if no page backs it.
    #[inline]
    #[must_use]
    pub fn get_ref(&self, index: usize) -> Option<&T> {
        let (page, offset) = self.locate(index);
        self.pages.get(page).map(|p| &p[offset])
    }

    /// Mutable value at `index`, `None` if no page backs it.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let (page, offset) = self.locate(index);
        self.pages.get_mut(page).map(|p| &mut p[offset])
    }

    /// Value at `index`, `None` if no page backs it.
    #[inline]
    #[must_use]
    pub fn try_get(&self, index: usize) -> Option<T> {
        self.get_ref(index).cloned()
    }

    /// Value at a `(page, offset)` pair, default if the pair is not backed.
    #[inline]
    #[must_use]
    pub fn get_at(&self, page: usize, offset: usize) -> T {
        self.pages
            .get(page)
            .and_then(|p| p.get(offset))
            .cloned()
            .unwrap_or_default()
    }

    /// Writes `value` at `index`, allocating pages up to it.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        let (page, offset) = self.locate(index);
        self.set_at(page, offset, value);
    }

    /// Writes `value` at a `(page, offset)` pair, allocating pages up to it.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not smaller than the page size.
    #[inline]
    pub fn set_at(&mut self, page: usize, offset: usize, value: T) {
        assert!(offset <= self.mask, "offset {offset} outside page");
        self.ensure_page(page);
        self.pages[page][offset] = value;
    }

    /// Releases every page strictly above the page holding `index`.
    ///
    /// Later reads there return the default value; a later write allocates
    /// fresh pages.
    pub fn shrink_to(&mut self, index: usize) {
        let keep = (index >> self.page_power) + 1;
        if self.pages.len() > keep {
            let released = self.pages.len() - keep;
            self.pages.truncate(keep);
            tracing::debug!(released, pages = keep, "paged array released pages");
        }
    }

    /// Moves `len` elements from `src` to `dst`.
    ///
    /// Overlapping ranges behave like `memmove`, in either direction and
    /// across page boundaries. The array grows to fit the destination; source
    /// positions that are not backed read as the default value.
    pub fn copy_range(&mut self, src: usize, len: usize, dst: usize) {
        if len == 0 || src == dst {
            return;
        }
        self.ensure_page((dst + len - 1) >> self.page_power);
        let page_size = self.page_size();

        if dst < src {
            let mut done = 0;
            while done < len {
                let (sp, so) = self.locate(src + done);
                let (dp, dof) = self.locate(dst + done);
                let n = (len - done).min(page_size - so).min(page_size - dof);
                self.move_chunk((sp, so), (dp, dof), n, false);
                done += n;
            }
        } else {
            let mut left = len;
            while left > 0 {
                let (sp, so) = self.locate(src + left - 1);
                let (dp, dof) = self.locate(dst + left - 1);
                let n = left.min(so + 1).min(dof + 1);
                self.move_chunk((sp, so + 1 - n), (dp, dof + 1 - n), n, true);
                left -= n;
            }
        }
    }

    /// Moves `n` elements where both runs stay inside one page each.
    fn move_chunk(&mut self, src: (usize, usize), dst: (usize, usize), n: usize, backward: bool) {
        let (sp, so) = src;
        let (dp, dof) = dst;
        if sp >= self.pages.len() {
            for slot in &mut self.pages[dp][dof..dof + n] {
                *slot = T::default();
            }
        } else if sp == dp {
            let page = &mut self.pages[dp];
            if backward {
                for k in (0..n).rev() {
                    let value = page[so + k].clone();
                    page[dof + k] = value;
                }
            } else {
                for k in 0..n {
                    let value = page[so + k].clone();
                    page[dof + k] = value;
                }
            }
        } else if sp < dp {
            let (low, high) = self.pages.split_at_mut(dp);
            high[0][dof..dof + n].clone_from_slice(&low[sp][so..so + n]);
        } else {
            let (low, high) = self.pages.split_at_mut(sp);
            low[dp][dof..dof + n].clone_from_slice(&high[0][so..so + n]);
        }
    }

    /// Clones the array's elements into `out`, as many as fit.
    pub fn copy_to(&self, out: &mut [T]) {
        for (slot, value) in out.iter_mut().zip(self.iter()) {
            slot.clone_from(value);
        }
    }

    /// Overwrites every materialized element with `value`.
    pub fn fill(&mut self, value: &T) {
        for page in &mut self.pages {
            page.fill(value.clone());
        }
    }
}

impl<T> PagedArray<T> {
    /// Number of backed elements (always a multiple of the page size).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len() << self.page_power
    }

    /// Always false: at least one page is materialized.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of materialized pages.
    #[inline]
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of page-table slots currently reserved.
    #[inline]
    #[must_use]
    pub fn page_table_capacity(&self) -> usize {
        self.pages.capacity()
    }

    /// Elements per page.
    #[inline]
    #[must_use]
    pub const fn page_size(&self) -> usize {
        1 << self.page_power
    }

    /// Page size as a power of two.
    #[inline]
    #[must_use]
    pub const fn page_power(&self) -> u32 {
        self.page_power
    }

    /// Iterates every element of every materialized page, in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.pages.iter().flat_map(|page| page.iter())
    }
}

impl<T: Clone + Default> Default for PagedArray<T> {
    fn default() -> Self {
        Self::with_config(&StorageConfig::default())
    }
}

impl<T: Clone + Default> Sequence<T> for PagedArray<T> {
    fn from_config(config: &StorageConfig) -> Self {
        Self::with_config(config)
    }

    fn len(&self) -> usize {
        PagedArray::len(self)
    }

    fn get(&self, index: usize) -> T {
        PagedArray::get(self, index)
    }

    fn get_ref(&self, index: usize) -> Option<&T> {
        PagedArray::get_ref(self, index)
    }

    fn set(&mut self, index: usize, value: T) {
        PagedArray::set(self, index, value);
    }

    fn shrink_to(&mut self, index: usize) {
        PagedArray::shrink_to(self, index);
    }

    fn copy_range(&mut self, src: usize, len: usize, dst: usize) {
        PagedArray::copy_range(self, src, len, dst);
    }

    fn fill(&mut self, value: &T) {
        PagedArray::fill(self, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_one_page() {
        let array: PagedArray<u32> = PagedArray::new(4, 2);
        assert_eq!(array.len(), 16);
        assert_eq!(array.page_count(), 1);
        assert_eq!(array.page_size(), 16);
        assert_eq!(array.locate(37), (2, 5));
    }

    #[test]
    fn test_read_past_end_does_not_allocate() {
        let array: PagedArray<u32> = PagedArray::new(4, 1);
        assert_eq!(array.get(1000), 0);
        assert_eq!(array.try_get(1000), None);
        assert_eq!(array.get_at(9, 3), 0);
        assert_eq!(array.page_count(), 1);
    }

    #[test]
    fn test_write_grows_through_target_page() {
        let mut array = PagedArray::new(4, 1);
        array.set(100, 7u32);
        assert_eq!(array.page_count(), 7);
        assert_eq!(array.len(), 112);
        assert_eq!(array.get(100), 7);
        assert_eq!(array.get(99), 0);
        assert!(array.page_table_capacity() >= 7);
    }

    #[test]
    fn test_page_table_doubles() {
        let mut array = PagedArray::new(1, 2);
        array.set(4, 1u8);
        assert_eq!(array.page_count(), 3);
        assert_eq!(array.page_table_capacity(), 4);
    }

    #[test]
    fn test_set_at_matches_set() {
        let mut array = PagedArray::new(3, 1);
        array.set_at(2, 5, 42u16);
        assert_eq!(array.get(21), 42);
        assert_eq!(array.get_at(2, 5), 42);
    }

    #[test]
    fn test_shrink_releases_trailing_pages() {
        let mut array = PagedArray::new(4, 1);
        array.set(70, 3u32);
        array.set(5, 9);
        array.shrink_to(20);
        assert_eq!(array.page_count(), 2);
        assert_eq!(array.get(70), 0);
        assert_eq!(array.get(5), 9);

        // Growth after shrink reads fresh defaults.
        array.set(80, 1);
        assert_eq!(array.get(70), 0);
    }

    #[test]
    fn test_copy_range_forward_overlap_across_pages() {
        let mut array = PagedArray::new(2, 1);
        let mut oracle = vec![0u32; 24];
        for i in 0..20 {
            array.set(i, i as u32 + 1);
            oracle[i] = i as u32 + 1;
        }
        array.copy_range(3, 10, 6);
        oracle.copy_within(3..13, 6);
        for (i, expected) in oracle.iter().enumerate() {
            assert_eq!(array.get(i), *expected, "index {i}");
        }
    }

    #[test]
    fn test_copy_range_backward_overlap_across_pages() {
        let mut array = PagedArray::new(2, 1);
        let mut oracle = vec![0u32; 24];
        for i in 0..20 {
            array.set(i, i as u32 + 1);
            oracle[i] = i as u32 + 1;
        }
        array.copy_range(7, 11, 1);
        oracle.copy_within(7..18, 1);
        for (i, expected) in oracle.iter().enumerate() {
            assert_eq!(array.get(i), *expected, "index {i}");
        }
    }

    #[test]
    fn test_copy_range_grows_and_reads_defaults() {
        let mut array = PagedArray::new(2, 1);
        array.set(0, 5u32);
        array.copy_range(0, 8, 30);
        assert_eq!(array.get(30), 5);
        assert_eq!(array.get(31), 0);
        assert_eq!(array.get(37), 0);
        assert_eq!(array.page_count(), 10);
    }

    #[test]
    fn test_copy_to_and_iter() {
        let mut array = PagedArray::new(2, 1);
        array.set(5, 11u32);
        let mut out = vec![99; 6];
        array.copy_to(&mut out);
        assert_eq!(out, vec![0, 0, 0, 0, 0, 11]);
        assert_eq!(array.iter().count(), 8);
    }

    #[test]
    fn test_fill_covers_backed_pages() {
        let mut array = PagedArray::new(2, 1);
        array.set(6, 0u8);
        array.fill(&3);
        assert!(array.iter().all(|v| *v == 3));
        assert_eq!(array.get(8), 0);
    }
}

//! # Flat Array
//!
//! Contiguous counterpart of [`PagedArray`](super::PagedArray): one `Vec`,
//! same read-default / grow-on-write contract. Growth copies the payload, so
//! it suits structures that resize rarely and explicitly.

use crate::buffer::Sequence;
use crate::config::StorageConfig;

/// Growable contiguous array with default reads past the end.
#[derive(Clone, Debug, Default)]
pub struct FlatArray<T> {
    items: Vec<T>,
}

impl<T: Clone + Default> FlatArray<T> {
    /// Creates an array of `capacity` default elements.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, T::default);
        Self { items }
    }

    /// Creates an array sized by `config.initial_capacity`.
    #[must_use]
    pub fn with_config(config: &StorageConfig) -> Self {
        Self::new(config.initial_capacity)
    }

    /// Value at `index`, or the default value past the end.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        self.items.get(index).cloned().unwrap_or_default()
    }

    /// Borrowed value at `index`.
    #[inline]
    #[must_use]
    pub fn get_ref(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Mutable value at `index`.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Writes `value` at `index`, at least doubling the length if needed.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        if index >= self.items.len() {
            let grown = (index + 1).max(self.items.len() * 2);
            self.items.resize_with(grown, T::default);
        }
        self.items[index] = value;
    }

    /// Resizes to exactly `capacity` elements, keeping the common prefix.
    pub fn reallocate(&mut self, capacity: usize) {
        if capacity < self.items.len() {
            self.items.truncate(capacity);
            self.items.shrink_to_fit();
        } else {
            self.items.reserve_exact(capacity - self.items.len());
            self.items.resize_with(capacity, T::default);
        }
    }

    /// Truncates to `index + 1` elements.
    pub fn shrink_to(&mut self, index: usize) {
        self.items.truncate(index + 1);
    }

    /// Moves `len` elements from `src` to `dst` with `memmove` semantics.
    pub fn copy_range(&mut self, src: usize, len: usize, dst: usize) {
        if len == 0 || src == dst {
            return;
        }
        if self.items.len() < dst + len {
            self.items.resize_with(dst + len, T::default);
        }
        if dst < src {
            for k in 0..len {
                let value = self.get(src + k);
                self.items[dst + k] = value;
            }
        } else {
            for k in (0..len).rev() {
                let value = self.get(src + k);
                self.items[dst + k] = value;
            }
        }
    }

    /// Overwrites every element with `value`.
    pub fn fill(&mut self, value: &T) {
        self.items.fill(value.clone());
    }
}

impl<T> FlatArray<T> {
    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates all elements in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Clone + Default> Sequence<T> for FlatArray<T> {
    fn from_config(config: &StorageConfig) -> Self {
        Self::with_config(config)
    }

    fn len(&self) -> usize {
        FlatArray::len(self)
    }

    fn get(&self, index: usize) -> T {
        FlatArray::get(self, index)
    }

    fn get_ref(&self, index: usize) -> Option<&T> {
        FlatArray::get_ref(self, index)
    }

    fn set(&mut self, index: usize, value: T) {
        FlatArray::set(self, index, value);
    }

    fn shrink_to(&mut self, index: usize) {
        FlatArray::shrink_to(self, index);
    }

    fn copy_range(&mut self, src: usize, len: usize, dst: usize) {
        FlatArray::copy_range(self, src, len, dst);
    }

    fn fill(&mut self, value: &T) {
        FlatArray::fill(self, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_on_write() {
        let mut array = FlatArray::new(4);
        array.set(9, 1u32);
        assert_eq!(array.len(), 10);
        array.set(10, 2);
        assert_eq!(array.len(), 20);
        assert_eq!(array.get(50), 0);
    }

    #[test]
    fn test_reallocate_exact() {
        let mut array = FlatArray::new(8);
        array.set(2, 5u8);
        array.set(7, 6);
        array.reallocate(4);
        assert_eq!(array.len(), 4);
        assert_eq!(array.get(2), 5);
        assert_eq!(array.get(7), 0);
        array.reallocate(16);
        assert_eq!(array.len(), 16);
    }

    #[test]
    fn test_copy_range_matches_copy_within() {
        let mut array = FlatArray::new(0);
        let mut oracle: Vec<u32> = (1..=12).collect();
        for (i, v) in oracle.iter().enumerate() {
            array.set(i, *v);
        }
        array.copy_range(2, 6, 5);
        oracle.copy_within(2..8, 5);
        assert_eq!(&array.as_slice()[..12], oracle.as_slice());
    }
}

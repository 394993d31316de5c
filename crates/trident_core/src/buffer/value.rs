//! # Value Buffer
//!
//! The triple-buffer protocol for one scalar: counts, list heads, tree
//! shape. A dirty flag replaces the queue. A writer commit with nothing
//! dirty returns without taking the lock; a reader commit always takes it to
//! read the shared flag.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::{CommitRead, CommitWrite, TransactionMode};

struct SharedValue<T> {
    value: T,
    dirty: bool,
}

/// Writer half of a [`ValueBuffer`].
pub struct ValueWriter<T> {
    value: T,
    dirty: bool,
    shared: Arc<Mutex<SharedValue<T>>>,
}

/// Reader half of a [`ValueBuffer`].
pub struct ValueReader<T> {
    value: T,
    shared: Arc<Mutex<SharedValue<T>>>,
}

/// Triple-buffered single value.
pub struct ValueBuffer<T> {
    writer: ValueWriter<T>,
    reader: ValueReader<T>,
}

impl<T: Clone> ValueWriter<T> {
    /// Writer's current value.
    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replaces the writer's value and flags it for publication.
    #[inline]
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    /// Publishes the value if it changed; returns 1 if it did, else 0.
    pub fn commit_write(&mut self) -> usize {
        if !self.dirty {
            return 0;
        }
        let mut shared = self.shared.lock();
        shared.value.clone_from(&self.value);
        shared.dirty = true;
        self.dirty = false;
        1
    }
}

impl<T: Clone> ValueReader<T> {
    /// Reader's snapshot.
    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Pulls the published value if there is a new one; returns 1 if so.
    pub fn commit_read(&mut self) -> usize {
        let mut shared = self.shared.lock();
        if !shared.dirty {
            return 0;
        }
        self.value.clone_from(&shared.value);
        shared.dirty = false;
        1
    }
}

impl<T: Clone> ValueBuffer<T> {
    /// Creates a buffer whose three copies hold `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        let shared = Arc::new(Mutex::new(SharedValue {
            value: initial.clone(),
            dirty: false,
        }));
        Self {
            writer: ValueWriter {
                value: initial.clone(),
                dirty: false,
                shared: Arc::clone(&shared),
            },
            reader: ValueReader {
                value: initial,
                shared,
            },
        }
    }

    /// Separates the writer and reader halves.
    #[must_use]
    pub fn split(self) -> (ValueWriter<T>, ValueReader<T>) {
        (self.writer, self.reader)
    }

    /// The copy `mode` addresses.
    #[inline]
    #[must_use]
    pub fn get(&self, mode: TransactionMode) -> &T {
        match mode {
            TransactionMode::WriteRead => self.writer.get(),
            TransactionMode::ReadOnly => self.reader.get(),
        }
    }

    /// Replaces the writer's value; ignored under `ReadOnly`.
    #[inline]
    pub fn set(&mut self, mode: TransactionMode, value: T) {
        if mode.is_writable() {
            self.writer.set(value);
        }
    }

    /// See [`ValueWriter::commit_write`].
    pub fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }

    /// See [`ValueReader::commit_read`].
    pub fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }
}

impl<T: Clone + Default> Default for ValueBuffer<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> CommitWrite for ValueWriter<T> {
    fn commit_write(&mut self) -> usize {
        ValueWriter::commit_write(self)
    }
}

impl<T: Clone> CommitRead for ValueReader<T> {
    fn commit_read(&mut self) -> usize {
        ValueReader::commit_read(self)
    }
}

impl<T: Clone> CommitWrite for ValueBuffer<T> {
    fn commit_write(&mut self) -> usize {
        self.writer.commit_write()
    }
}

impl<T: Clone> CommitRead for ValueBuffer<T> {
    fn commit_read(&mut self) -> usize {
        self.reader.commit_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TransactionMode::{ReadOnly, WriteRead};

    #[test]
    fn test_value_visibility() {
        let mut count = ValueBuffer::new(0usize);
        count.set(WriteRead, 3);
        assert_eq!(*count.get(WriteRead), 3);
        assert_eq!(*count.get(ReadOnly), 0);
        assert_eq!(count.commit_read(), 0);
        assert_eq!(count.commit_write(), 1);
        assert_eq!(count.commit_read(), 1);
        assert_eq!(*count.get(ReadOnly), 3);
    }

    #[test]
    fn test_clean_commits_are_skipped() {
        let mut head = ValueBuffer::new(7u64);
        assert_eq!(head.commit_write(), 0);
        assert_eq!(head.commit_read(), 0);
        head.set(ReadOnly, 1);
        assert_eq!(head.commit_write(), 0);
        assert_eq!(*head.get(WriteRead), 7);
    }

    #[test]
    fn test_latest_publication_wins() {
        let (mut writer, mut reader) = ValueBuffer::new(0i32).split();
        writer.set(1);
        writer.commit_write();
        writer.set(2);
        writer.commit_write();
        assert_eq!(reader.commit_read(), 1);
        assert_eq!(*reader.get(), 2);
    }
}

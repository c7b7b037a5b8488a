//! Cache-line aligned storage.
//!
//! Records that live in hot loops are sized and aligned to whole cache lines so
//! that two records never share a line and a worker touching one record never
//! invalidates a line another worker is reading.

use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ops::{Deref, DerefMut};

/// Cache line size assumed for padding and alignment.
pub const CACHE_LINE_SIZE: usize = 64;

/// Marker for plain records laid out in whole cache lines.
///
/// Implementors must be `#[repr(C, align(64))]` (or larger) so that their size
/// is a multiple of [`CACHE_LINE_SIZE`]. [`AlignedBuffer`] checks this when it
/// is instantiated for the type.
pub trait CacheAligned: Copy + Send + Sync + 'static {}

struct LayoutCheck<T>(PhantomData<T>);

impl<T> LayoutCheck<T> {
    const OK: () = assert!(
        size_of::<T>() % CACHE_LINE_SIZE == 0 && align_of::<T>() >= CACHE_LINE_SIZE,
        "record is not a whole number of cache lines"
    );
}

/// Growable contiguous buffer of cache-line aligned records.
///
/// The element type carries the alignment, so the backing allocation starts on
/// a cache-line boundary and every element begins a new line.
#[derive(Debug, Clone)]
pub struct AlignedBuffer<T: CacheAligned> {
    items: Vec<T>,
}

impl<T: CacheAligned> AlignedBuffer<T> {
    /// Create an empty buffer with room for `capacity` records.
    ///
    /// Allocation failure aborts the process.
    pub fn with_capacity(capacity: usize) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = LayoutCheck::<T>::OK;
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn extend_from_slice(&mut self, items: &[T]) {
        self.items.extend_from_slice(items);
    }

    pub fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
    }

    /// Drop all records, keeping the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }
}

impl<T: CacheAligned> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

/// Pads and aligns a value to its own cache line.
///
/// Used for atomics written by different threads (ring buffer indices, global
/// counters) so they do not false-share.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    pub const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CachePadded<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    #[repr(C, align(64))]
    struct Line {
        value: u64,
    }

    impl CacheAligned for Line {}

    #[test]
    fn test_buffer_elements_start_on_cache_lines() {
        let mut buffer = AlignedBuffer::with_capacity(4);
        for value in 0..4 {
            buffer.push(Line { value });
        }

        for line in buffer.iter() {
            let addr = line as *const Line as usize;
            assert_eq!(addr % CACHE_LINE_SIZE, 0);
        }
        assert_eq!(buffer[3].value, 3);
    }

    #[test]
    fn test_buffer_clear_keeps_capacity() {
        let mut buffer = AlignedBuffer::with_capacity(16);
        buffer.push(Line { value: 1 });
        buffer.clear();

        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 16);
    }

    #[test]
    fn test_cache_padded_layout() {
        assert_eq!(align_of::<CachePadded<u8>>(), CACHE_LINE_SIZE);
        assert_eq!(size_of::<CachePadded<u64>>(), CACHE_LINE_SIZE);

        let padded = CachePadded::new(7u32);
        assert_eq!(*padded, 7);
    }
}

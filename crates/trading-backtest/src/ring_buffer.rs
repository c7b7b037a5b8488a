//! Bounded single-producer/single-consumer ring buffer.
//!
//! [`channel`] splits the buffer into a [`Producer`] and a [`Consumer`]. Neither
//! half is `Clone` and both operations take `&mut self`, so the type system
//! enforces one writer and one reader. Multiple producers need a different
//! algorithm (for example a bounded MPMC array queue), not this index scheme.
//!
//! One slot is always left empty to tell "full" from "empty": a buffer with
//! `N` slots holds at most `N - 1` items.
//!
//! Memory ordering: the producer writes the slot and then publishes `tail`
//! with `Release`; the consumer reads `tail` with `Acquire` before reading the
//! slot. `head` is published and observed the same way in the other direction,
//! so the producer never reuses a slot the consumer is still reading.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trading_core::CachePadded;

struct Shared<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Next slot to read; written only by the consumer.
    head: CachePadded<AtomicUsize>,
    /// Next slot to write; written only by the producer.
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: a slot is accessed by at most one side at a time. The producer only
// touches slots in [tail, head - 1) and the consumer only [head, tail); the
// release/acquire pairs on head and tail hand each slot over.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn next(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.slots.len() {
            0
        } else {
            next
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let mut head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        while head != tail {
            // SAFETY: slots in [head, tail) hold initialized, unread items and
            // both halves are gone.
            unsafe { self.slots[head].get_mut().assume_init_drop() };
            head = self.next(head);
        }
    }
}

/// Writing half of a ring buffer.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

/// Reading half of a ring buffer.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

/// Create a ring buffer with `slots` slots, which holds up to `slots - 1`
/// items. At least two slots are allocated.
pub fn channel<T>(slots: usize) -> (Producer<T>, Consumer<T>) {
    let slots: Box<[UnsafeCell<MaybeUninit<T>>]> = (0..slots.max(2))
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect();

    let shared = Arc::new(Shared {
        slots,
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
    });

    (
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

impl<T> Producer<T> {
    /// Append `item`, or hand it back if the buffer is full.
    ///
    /// Never blocks. A rejected item leaves the buffer unchanged.
    pub fn try_enqueue(&mut self, item: T) -> Result<(), T> {
        let shared = &*self.shared;
        let tail = shared.tail.load(Ordering::Relaxed);
        let next = shared.next(tail);
        if next == shared.head.load(Ordering::Acquire) {
            return Err(item);
        }

        // SAFETY: the slot at `tail` is outside [head, tail), so the consumer
        // does not read it until the store below publishes it.
        unsafe { (*shared.slots[tail].get()).write(item) };
        shared.tail.store(next, Ordering::Release);
        Ok(())
    }

    /// Items the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.shared.slots.len() - 1
    }
}

impl<T> Consumer<T> {
    /// Take the oldest item, or `None` if the buffer is empty.
    ///
    /// Never blocks.
    pub fn try_dequeue(&mut self) -> Option<T> {
        let shared = &*self.shared;
        let head = shared.head.load(Ordering::Relaxed);
        if head == shared.tail.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: the acquire load of `tail` makes the producer's write of this
        // slot visible, and the producer will not touch it again until `head`
        // moves past it.
        let item = unsafe { (*shared.slots[head].get()).assume_init_read() };
        shared.head.store(shared.next(head), Ordering::Release);
        Some(item)
    }

    /// Number of items currently readable.
    pub fn len(&self) -> usize {
        let shared = &*self.shared;
        let head = shared.head.load(Ordering::Relaxed);
        let tail = shared.tail.load(Ordering::Acquire);
        if tail >= head {
            tail - head
        } else {
            shared.slots.len() - head + tail
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("len", &self.len()).finish()
    }
}

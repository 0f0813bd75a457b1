//! Fixed-capacity sample buffer with blocking push and pop.
//!
//! The buffer is the backpressure point between the monitor (producer) and
//! the collector (consumer): a push blocks while every slot is occupied, a
//! pop blocks while none is. Samples leave in exactly the order they
//! entered.

use std::fmt;
use std::sync::{Condvar, Mutex};

/// Error returned by [`SampleBuffer::push`] once the buffer has been closed.
///
/// Carries the rejected sample back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushError(pub u64);

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer closed, sample {} rejected", self.0)
    }
}

impl std::error::Error for PushError {}

/// Ring state, only ever touched under the buffer lock.
#[derive(Debug)]
struct Ring {
    slots: Vec<u64>,
    /// Next slot to pop.
    head: usize,
    /// Next slot to push.
    tail: usize,
    occupied: usize,
    closed: bool,
}

/// Bounded FIFO buffer shared between one producer and one consumer.
///
/// Capacity is fixed at construction. Producers suspend on `slot_free` while
/// the buffer is full, consumers suspend on `slot_filled` while it is empty;
/// both waits release the lock for their whole duration, and every completed
/// operation wakes exactly one counterpart. The lock is held only around
/// index updates, never across a sleep.
///
/// [`close`](SampleBuffer::close) ends the buffer's life for shutdown:
/// producers are turned away, consumers drain what is left and then see the
/// end of the stream. Waiters blocked at close time are woken.
#[derive(Debug)]
pub struct SampleBuffer {
    capacity: usize,
    ring: Mutex<Ring>,
    /// Producers wait here for a free slot.
    slot_free: Condvar,
    /// Consumers wait here for an occupied slot.
    slot_filled: Condvar,
}

impl SampleBuffer {
    /// Creates a buffer with `capacity` slots.
    ///
    /// # Panics
    /// Panics if `capacity` is zero; a zero-slot buffer could never make
    /// progress.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be > 0");
        Self {
            capacity,
            ring: Mutex::new(Ring {
                slots: vec![0; capacity],
                head: 0,
                tail: 0,
                occupied: 0,
                closed: false,
            }),
            slot_free: Condvar::new(),
            slot_filled: Condvar::new(),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots at the time of the call.
    ///
    /// Best-effort: the answer can be stale by the time the caller sees it.
    /// Use only for diagnostics, never for control decisions.
    pub fn len(&self) -> usize {
        self.ring.lock().expect("buffer mutex poisoned").occupied
    }

    /// Whether no slot is occupied. Best-effort, diagnostics only.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every slot is occupied. Best-effort, diagnostics only.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Whether [`close`](SampleBuffer::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.ring.lock().expect("buffer mutex poisoned").closed
    }

    /// Appends `value`, blocking while the buffer is at capacity.
    ///
    /// Returns the index of the slot written. Fails only when the buffer
    /// has been closed, in which case the rejected value travels back in
    /// the error.
    pub fn push(&self, value: u64) -> Result<usize, PushError> {
        let mut ring = self.ring.lock().expect("buffer mutex poisoned");
        while ring.occupied == self.capacity && !ring.closed {
            ring = self.slot_free.wait(ring).expect("buffer mutex poisoned");
        }
        if ring.closed {
            return Err(PushError(value));
        }

        let slot = ring.tail;
        ring.slots[slot] = value;
        ring.tail = (ring.tail + 1) % self.capacity;
        ring.occupied += 1;
        drop(ring);

        self.slot_filled.notify_one();
        Ok(slot)
    }

    /// Removes the oldest sample, blocking while the buffer is empty.
    ///
    /// Returns the sample and the index of the slot it was read from.
    /// Returns `None` only once the buffer is closed *and* drained; samples
    /// buffered before the close are still delivered.
    pub fn pop(&self) -> Option<(u64, usize)> {
        let mut ring = self.ring.lock().expect("buffer mutex poisoned");
        while ring.occupied == 0 && !ring.closed {
            ring = self.slot_filled.wait(ring).expect("buffer mutex poisoned");
        }
        if ring.occupied == 0 {
            // Closed and drained.
            return None;
        }

        let slot = ring.head;
        let value = ring.slots[slot];
        ring.head = (ring.head + 1) % self.capacity;
        ring.occupied -= 1;
        drop(ring);

        self.slot_free.notify_one();
        Some((value, slot))
    }

    /// Closes the buffer and wakes every blocked producer and consumer.
    ///
    /// Idempotent; calling it again is a no-op.
    pub fn close(&self) {
        let mut ring = self.ring.lock().expect("buffer mutex poisoned");
        if ring.closed {
            return;
        }
        ring.closed = true;
        drop(ring);

        self.slot_free.notify_all();
        self.slot_filled.notify_all();
    }
}

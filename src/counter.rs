//! Shared message counter.
//!
//! All counter workers funnel their increments through a single
//! mutex-protected accumulator; the monitor drains it with an atomic
//! read-and-reset.

use std::sync::Mutex;

/// Mutex-protected accumulator for incoming message counts.
///
/// Every access takes the internal lock, so increments and resets are fully
/// serialized: a concurrent increment lands either entirely before or
/// entirely after a `read_and_reset`, never in between.
///
/// Overflow of the underlying `u64` is not handled; at realistic message
/// rates the counter cannot wrap within the lifetime of a process.
#[derive(Debug, Default)]
pub struct MessageCounter {
    value: Mutex<u64>,
}

impl MessageCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to the counter and returns the new value.
    ///
    /// The returned value is a snapshot taken under the lock and is only
    /// meaningful for diagnostic logging.
    pub fn increment(&self) -> u64 {
        let mut value = self.value.lock().expect("counter mutex poisoned");
        *value += 1;
        *value
    }

    /// Returns the current value and resets the counter to zero.
    ///
    /// Capture and reset happen under one lock acquisition, so no increment
    /// is lost or counted twice across consecutive drains.
    pub fn read_and_reset(&self) -> u64 {
        let mut value = self.value.lock().expect("counter mutex poisoned");
        std::mem::take(&mut *value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn read_and_reset_drains_previous_increments() {
        let counter = MessageCounter::new();
        counter.increment();
        counter.increment();
        counter.increment();
        assert_eq!(counter.read_and_reset(), 3);
        // Nothing arrived since the drain.
        assert_eq!(counter.read_and_reset(), 0);
    }

    #[test]
    fn increment_returns_running_value() {
        let counter = MessageCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.increment(), 3);
    }

    #[test]
    fn concurrent_increments_are_never_lost() {
        const THREADS: usize = 8;
        const INCREMENTS: u64 = 1000;

        let counter = Arc::new(MessageCounter::new());
        let mut handles = Vec::new();
        for _ in 0..THREADS {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    counter.increment();
                }
            }));
        }

        // Drain while increments are still in flight; whatever the
        // interleaving, the drained totals must add up exactly.
        let mut drained = counter.read_and_reset();
        for handle in handles {
            handle.join().unwrap();
            drained += counter.read_and_reset();
        }
        drained += counter.read_and_reset();
        assert_eq!(drained, THREADS as u64 * INCREMENTS);
    }
}

//! Cooperative shutdown signalling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Granularity of interruptible sleeps. A shutdown request takes effect
/// within one slice even in the middle of a long interval.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Cloneable cancellation flag shared by every worker of a pipeline.
///
/// Workers poll [`is_triggered`](ShutdownToken::is_triggered) at loop
/// boundaries and between sleep slices; nothing is ever cancelled while
/// holding a lock or a buffer slot.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Creates an untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown.
    ///
    /// Returns `true` for exactly one caller, no matter how many clones race
    /// on it, so one-shot teardown work can be guarded by the return value
    /// (a second Ctrl-C must not tear anything down twice).
    pub fn trigger(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration`, waking early if the token fires.
    ///
    /// Returns `true` if the full duration elapsed and `false` if the sleep
    /// was cut short (or the token was already triggered on entry).
    pub fn sleep(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        loop {
            if self.is_triggered() {
                return false;
            }
            if remaining == Duration::ZERO {
                return true;
            }
            let slice = remaining.min(SLEEP_SLICE);
            thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn trigger_returns_true_exactly_once() {
        let token = ShutdownToken::new();
        assert!(!token.is_triggered());
        assert!(token.trigger());
        assert!(!token.trigger());
        assert!(token.is_triggered());

        // Clones observe and share the same flag.
        let clone = token.clone();
        assert!(clone.is_triggered());
        assert!(!clone.trigger());
    }

    #[test]
    fn sleep_completes_when_untriggered() {
        let token = ShutdownToken::new();
        assert!(token.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn sleep_is_cut_short_by_trigger() {
        let token = ShutdownToken::new();
        let waker = {
            let token = token.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                token.trigger();
            })
        };

        let start = Instant::now();
        assert!(!token.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        waker.join().unwrap();
    }

    #[test]
    fn sleep_returns_immediately_once_triggered() {
        let token = ShutdownToken::new();
        token.trigger();
        let start = Instant::now();
        assert!(!token.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}

//! Pipeline configuration and validation.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Default number of counter worker threads.
pub const DEFAULT_COUNTER_WORKERS: usize = 10;

/// Default number of slots in the sample buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 5;

/// Default upper bound (exclusive) for the counter workers' random sleep.
pub const DEFAULT_COUNTER_SLEEP_MAX: Duration = Duration::from_secs(6);

/// Default bounds for the monitor's random sleep between drains.
pub const DEFAULT_MONITOR_SLEEP_MIN: Duration = Duration::from_secs(3);
pub const DEFAULT_MONITOR_SLEEP_MAX: Duration = Duration::from_secs(9);

/// Default bounds for the collector's random sleep between reads.
pub const DEFAULT_COLLECTOR_SLEEP_MIN: Duration = Duration::from_secs(6);
pub const DEFAULT_COLLECTOR_SLEEP_MAX: Duration = Duration::from_secs(12);

/// Half-open interval `[min, max)` of sleep durations.
///
/// Each worker draws a fresh duration from its range every loop iteration to
/// simulate irregular message arrival and sampling timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRange {
    pub min: Duration,
    pub max: Duration,
}

impl SleepRange {
    /// Range with explicit bounds.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Range starting at zero.
    pub fn up_to(max: Duration) -> Self {
        Self {
            min: Duration::ZERO,
            max,
        }
    }

    /// Draws a duration uniformly from `[min, max)`.
    ///
    /// A degenerate range (`max <= min`) always yields `min`, which gives a
    /// fixed sleep instead of a random one.
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if max <= min {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..max))
    }
}

/// Runtime configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of counter worker threads.
    pub counter_workers: usize,
    /// Number of slots in the sample buffer.
    pub buffer_capacity: usize,
    /// Sleep range of the counter workers (message inter-arrival time).
    pub counter_sleep: SleepRange,
    /// Sleep range of the monitor between counter drains.
    pub monitor_sleep: SleepRange,
    /// Sleep range of the collector between buffer reads.
    pub collector_sleep: SleepRange,
    /// Whether the monitor stage runs. With the monitor disabled the buffer
    /// is never fed and the collector waits until shutdown.
    pub monitor_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            counter_workers: DEFAULT_COUNTER_WORKERS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            counter_sleep: SleepRange::up_to(DEFAULT_COUNTER_SLEEP_MAX),
            monitor_sleep: SleepRange::new(DEFAULT_MONITOR_SLEEP_MIN, DEFAULT_MONITOR_SLEEP_MAX),
            collector_sleep: SleepRange::new(
                DEFAULT_COLLECTOR_SLEEP_MIN,
                DEFAULT_COLLECTOR_SLEEP_MAX,
            ),
            monitor_enabled: true,
        }
    }
}

impl PipelineConfig {
    /// Checks the configuration before any thread is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counter_workers == 0 {
            return Err(ConfigError::NoCounterWorkers);
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        for (role, range) in [
            ("counter", self.counter_sleep),
            ("monitor", self.monitor_sleep),
            ("collector", self.collector_sleep),
        ] {
            if range.max < range.min {
                return Err(ConfigError::InvalidSleepRange {
                    role,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }
}

/// Configuration errors, rejected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The worker pool must have at least one thread.
    NoCounterWorkers,
    /// The buffer must have at least one slot.
    ZeroCapacity,
    /// A sleep range whose upper bound lies below its lower bound.
    InvalidSleepRange {
        role: &'static str,
        min: Duration,
        max: Duration,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoCounterWorkers => write!(f, "at least one counter worker is required"),
            ConfigError::ZeroCapacity => write!(f, "buffer capacity must be at least 1"),
            ConfigError::InvalidSleepRange { role, min, max } => write!(
                f,
                "invalid {} sleep range: max ({:?}) is below min ({:?})",
                role, max, min
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.counter_workers, 10);
        assert_eq!(config.buffer_capacity, 5);
        assert!(config.monitor_enabled);
    }

    #[test]
    fn zero_workers_rejected() {
        let config = PipelineConfig {
            counter_workers: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoCounterWorkers));
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = PipelineConfig {
            buffer_capacity: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn inverted_sleep_range_rejected() {
        let config = PipelineConfig {
            monitor_sleep: SleepRange::new(Duration::from_secs(9), Duration::from_secs(3)),
            ..PipelineConfig::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidSleepRange { role, .. }) => assert_eq!(role, "monitor"),
            other => panic!("expected InvalidSleepRange, got {:?}", other),
        }
    }

    #[test]
    fn sample_stays_within_bounds() {
        let range = SleepRange::new(Duration::from_millis(10), Duration::from_millis(20));
        for _ in 0..100 {
            let d = range.sample();
            assert!(d >= range.min && d < range.max);
        }
    }

    #[test]
    fn degenerate_range_yields_min() {
        let range = SleepRange::new(Duration::from_millis(5), Duration::from_millis(5));
        assert_eq!(range.sample(), Duration::from_millis(5));
        assert_eq!(SleepRange::up_to(Duration::ZERO).sample(), Duration::ZERO);
    }
}

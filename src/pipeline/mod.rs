//! Worker lifecycle for the message-rate pipeline.
//!
//! [`Pipeline::spawn`] starts the counter worker pool, the collector, and
//! (when enabled) the monitor, all sharing one [`PipelineState`];
//! [`Pipeline::shutdown`] plus [`Pipeline::join`] tear everything down
//! cooperatively.

mod collector;
mod counter_worker;
mod monitor;

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::buffer::SampleBuffer;
use crate::config::{ConfigError, PipelineConfig};
use crate::counter::MessageCounter;
use crate::shutdown::ShutdownToken;

/// State shared by every worker, handed out as an `Arc` at spawn time.
///
/// The counter and the buffer are the only shared mutable resources; each
/// one serializes its own accesses internally.
#[derive(Debug)]
pub(crate) struct PipelineState {
    pub(crate) counter: MessageCounter,
    pub(crate) buffer: SampleBuffer,
    pub(crate) shutdown: ShutdownToken,
    pub(crate) stats: PipelineStats,
    pub(crate) config: PipelineConfig,
}

/// Running totals for a pipeline run. Purely observational; the counters
/// play no synchronization role.
#[derive(Debug, Default)]
pub struct PipelineStats {
    messages_counted: AtomicU64,
    samples_enqueued: AtomicU64,
    samples_collected: AtomicU64,
}

impl PipelineStats {
    pub(crate) fn record_message(&self) {
        self.messages_counted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_enqueue(&self) {
        self.samples_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_collect(&self) {
        self.samples_collected.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the totals.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_counted: self.messages_counted.load(Ordering::Relaxed),
            samples_enqueued: self.samples_enqueued.load(Ordering::Relaxed),
            samples_collected: self.samples_collected.load(Ordering::Relaxed),
        }
    }
}

/// Copy of the run totals, as returned by [`Pipeline::stats`] and
/// [`Pipeline::join`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Increments applied to the shared counter.
    pub messages_counted: u64,
    /// Samples the monitor wrote into the buffer.
    pub samples_enqueued: u64,
    /// Samples the collector read out of the buffer.
    pub samples_collected: u64,
}

/// Error raised while starting the pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Configuration rejected before any thread was started.
    Config(ConfigError),
    /// The operating system refused to start a worker thread.
    Spawn { worker: String, source: io::Error },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "invalid configuration: {}", e),
            PipelineError::Spawn { worker, source } => {
                write!(f, "failed to spawn worker '{}': {}", worker, source)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Config(e) => Some(e),
            PipelineError::Spawn { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Config(e)
    }
}

/// Handle over a running pipeline.
///
/// Dropping the handle does not stop the workers; call
/// [`shutdown`](Pipeline::shutdown) and then [`join`](Pipeline::join).
pub struct Pipeline {
    state: Arc<PipelineState>,
    workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Validates `config` and starts every worker thread.
    ///
    /// Counter workers get ids `1..=counter_workers`. If the monitor is
    /// disabled the buffer is never fed and the collector blocks until
    /// shutdown. On a spawn failure the workers already running are shut
    /// down and joined before the error is returned, so no thread outlives
    /// a failed start.
    pub fn spawn(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let state = Arc::new(PipelineState {
            counter: MessageCounter::new(),
            buffer: SampleBuffer::new(config.buffer_capacity),
            shutdown: ShutdownToken::new(),
            stats: PipelineStats::default(),
            config: config.clone(),
        });
        let mut pipeline = Self {
            state,
            workers: Vec::with_capacity(config.counter_workers + 2),
        };

        for id in 1..=config.counter_workers {
            pipeline.start_worker(&format!("counter-{}", id), move |state| {
                counter_worker::run(id, &state)
            })?;
        }
        if config.monitor_enabled {
            pipeline.start_worker("monitor", |state| monitor::run(&state))?;
        }
        pipeline.start_worker("collector", |state| collector::run(&state))?;

        debug!(
            workers = config.counter_workers,
            capacity = config.buffer_capacity,
            monitor = config.monitor_enabled,
            "Pipeline started"
        );
        Ok(pipeline)
    }

    fn start_worker<F>(&mut self, name: &str, body: F) -> Result<(), PipelineError>
    where
        F: FnOnce(Arc<PipelineState>) + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        match thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(state))
        {
            Ok(handle) => {
                self.workers.push(handle);
                Ok(())
            }
            Err(source) => {
                // Unwind the partially started pipeline before reporting.
                self.shutdown();
                self.join_workers();
                Err(PipelineError::Spawn {
                    worker: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Requests cooperative shutdown.
    ///
    /// Trips the shutdown token and closes the buffer so workers blocked on
    /// a full or empty buffer wake up immediately. Idempotent.
    pub fn shutdown(&self) {
        if self.state.shutdown.trigger() {
            debug!("Pipeline shutdown requested");
        }
        self.state.buffer.close();
    }

    /// A token observing (and able to request) this pipeline's shutdown.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.state.shutdown.clone()
    }

    /// Current run totals.
    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot()
    }

    /// Waits for every worker to exit and returns the final run totals.
    ///
    /// Call [`shutdown`](Pipeline::shutdown) first; joining a live pipeline
    /// blocks until shutdown is requested elsewhere.
    pub fn join(mut self) -> StatsSnapshot {
        self.join_workers();
        self.state.stats.snapshot()
    }

    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("Worker '{}' panicked", name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SleepRange;
    use std::time::Duration;

    /// Config with millisecond-scale sleeps so tests finish quickly.
    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            counter_workers: 4,
            buffer_capacity: 2,
            counter_sleep: SleepRange::up_to(Duration::from_millis(2)),
            monitor_sleep: SleepRange::new(Duration::from_millis(1), Duration::from_millis(3)),
            collector_sleep: SleepRange::new(Duration::from_millis(1), Duration::from_millis(3)),
            monitor_enabled: true,
        }
    }

    #[test]
    fn invalid_config_is_rejected_before_spawn() {
        let config = PipelineConfig {
            buffer_capacity: 0,
            ..fast_config()
        };
        match Pipeline::spawn(config) {
            Err(PipelineError::Config(ConfigError::ZeroCapacity)) => {}
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn pipeline_makes_forward_progress() {
        let pipeline = Pipeline::spawn(fast_config()).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        pipeline.shutdown();
        let stats = pipeline.join();

        assert!(stats.messages_counted > 0, "counter workers never ran");
        assert!(stats.samples_enqueued > 0, "monitor never drained");
        assert!(stats.samples_collected > 0, "collector never drained");
    }

    #[test]
    fn no_sample_is_lost_on_shutdown() {
        let pipeline = Pipeline::spawn(fast_config()).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        pipeline.shutdown();
        let stats = pipeline.join();

        // The collector drains whatever is still buffered on the way out,
        // so every enqueued sample is eventually collected.
        assert_eq!(stats.samples_collected, stats.samples_enqueued);
    }

    #[test]
    fn shutdown_is_idempotent_and_join_is_prompt() {
        let pipeline = Pipeline::spawn(fast_config()).unwrap();
        pipeline.shutdown();
        pipeline.shutdown();
        let start = std::time::Instant::now();
        pipeline.join();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn disabled_monitor_leaves_buffer_unfed() {
        let config = PipelineConfig {
            monitor_enabled: false,
            ..fast_config()
        };
        let pipeline = Pipeline::spawn(config).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        // The collector blocks on the empty buffer; shutdown must still
        // wake it and join cleanly.
        pipeline.shutdown();
        let stats = pipeline.join();
        assert_eq!(stats.samples_enqueued, 0);
        assert_eq!(stats.samples_collected, 0);
        assert!(stats.messages_counted > 0);
    }

    #[test]
    fn external_token_trigger_stops_the_pipeline() {
        let pipeline = Pipeline::spawn(fast_config()).unwrap();
        let token = pipeline.shutdown_token();
        token.trigger();
        // The token alone stops the sleep loops; shutdown() also closes the
        // buffer for workers blocked mid-wait.
        pipeline.shutdown();
        pipeline.join();
    }
}

//! msgflowd - Bounded-buffer message-rate pipeline daemon.
//!
//! Runs a pool of counter threads that simulate incoming messages, a monitor
//! that periodically samples and resets the shared counter, and a collector
//! that drains the sampled counts from a bounded buffer. Stop with Ctrl-C.

use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use msgflow::config::{PipelineConfig, SleepRange};
use msgflow::pipeline::Pipeline;

/// Bounded-buffer message-rate pipeline daemon.
#[derive(Parser)]
#[command(name = "msgflowd", about = "Message-rate pipeline daemon", version)]
struct Args {
    /// Number of counter worker threads.
    #[arg(short, long, default_value = "10")]
    workers: usize,

    /// Number of slots in the sample buffer.
    #[arg(short, long, default_value = "5")]
    capacity: usize,

    /// Upper bound in seconds (exclusive) for the counter workers' random
    /// sleep between simulated messages.
    #[arg(long, default_value = "6", value_name = "SECS")]
    counter_sleep_max: u64,

    /// Lower bound in seconds for the monitor's sleep between samples.
    #[arg(long, default_value = "3", value_name = "SECS")]
    monitor_sleep_min: u64,

    /// Upper bound in seconds (exclusive) for the monitor's sleep.
    #[arg(long, default_value = "9", value_name = "SECS")]
    monitor_sleep_max: u64,

    /// Lower bound in seconds for the collector's sleep between reads.
    #[arg(long, default_value = "6", value_name = "SECS")]
    collector_sleep_min: u64,

    /// Upper bound in seconds (exclusive) for the collector's sleep.
    #[arg(long, default_value = "12", value_name = "SECS")]
    collector_sleep_max: u64,

    /// Run the monitor stage. Disable with --monitor=false to leave the
    /// buffer unfed; the collector then waits until shutdown.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    monitor: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("msgflowd={}", level).parse().unwrap())
        .add_directive(format!("msgflow={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Maps the CLI surface onto a pipeline configuration.
fn pipeline_config(args: &Args) -> PipelineConfig {
    PipelineConfig {
        counter_workers: args.workers,
        buffer_capacity: args.capacity,
        counter_sleep: SleepRange::up_to(Duration::from_secs(args.counter_sleep_max)),
        monitor_sleep: SleepRange::new(
            Duration::from_secs(args.monitor_sleep_min),
            Duration::from_secs(args.monitor_sleep_max),
        ),
        collector_sleep: SleepRange::new(
            Duration::from_secs(args.collector_sleep_min),
            Duration::from_secs(args.collector_sleep_max),
        ),
        monitor_enabled: args.monitor,
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = pipeline_config(&args);

    info!("msgflowd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: workers={}, capacity={}, monitor={}",
        config.counter_workers, config.buffer_capacity, config.monitor_enabled
    );
    if !config.monitor_enabled {
        warn!("Monitor disabled: the buffer will never be fed");
    }

    let pipeline = match Pipeline::spawn(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to start pipeline: {}", e);
            std::process::exit(1);
        }
    };

    // Setup graceful shutdown
    let shutdown = pipeline.shutdown_token();
    if let Err(e) = ctrlc::set_handler(move || {
        if shutdown.trigger() {
            info!("Received shutdown signal");
        }
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Pipeline running, press Ctrl-C to stop");

    let token = pipeline.shutdown_token();
    while !token.is_triggered() {
        std::thread::sleep(Duration::from_millis(100));
    }

    // Graceful shutdown
    info!("Shutting down...");
    pipeline.shutdown();
    let stats = pipeline.join();

    info!(
        "Run summary: {} messages counted, {} samples enqueued, {} samples collected",
        stats.messages_counted, stats.samples_enqueued, stats.samples_collected
    );
    info!("Shutdown complete");
}

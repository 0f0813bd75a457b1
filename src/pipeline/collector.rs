//! Collector worker: reads sampled counts back out of the buffer.

use tracing::{debug, info};

use super::PipelineState;

/// Body of the collector thread.
///
/// Each cycle pops the oldest sample, blocking while the buffer is empty.
/// On shutdown the samples already buffered are still collected before the
/// thread exits, so nothing the monitor published is dropped.
pub(crate) fn run(state: &PipelineState) {
    debug!("Collector started");

    loop {
        if !state.shutdown.sleep(state.config.collector_sleep.sample()) {
            break;
        }

        // Racy peek, for the log line only; pop() below is what decides.
        if state.buffer.is_empty() {
            info!("Nothing in the buffer, waiting for the monitor");
        }
        match state.buffer.pop() {
            Some((count, slot)) => {
                state.stats.record_collect();
                info!(count, slot, "Sample read from buffer");
            }
            // Buffer closed and drained.
            None => {
                debug!("Collector stopped");
                return;
            }
        }
    }

    // Shutdown while sleeping: flush what is already buffered first.
    while let Some((count, slot)) = state.buffer.pop() {
        state.stats.record_collect();
        info!(count, slot, "Sample read from buffer during shutdown drain");
    }

    debug!("Collector stopped");
}

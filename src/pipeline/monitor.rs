//! Monitor worker: drains the shared counter into the sample buffer.

use tracing::{debug, info, trace, warn};

use super::PipelineState;

/// Body of the monitor thread.
///
/// Each cycle drains the counter with a read-and-reset and pushes the
/// snapshot into the buffer, blocking while the buffer is at capacity. The
/// blocking push is what throttles sampling when the collector falls
/// behind.
pub(crate) fn run(state: &PipelineState) {
    debug!("Monitor started");

    loop {
        if !state.shutdown.sleep(state.config.monitor_sleep.sample()) {
            break;
        }

        trace!("Waiting to read the counter");
        let count = state.counter.read_and_reset();
        info!(count, "Drained the message counter");

        // Racy peek, for the log line only; push() below is what decides.
        if state.buffer.is_full() {
            warn!("Buffer full, waiting for the collector");
        }
        match state.buffer.push(count) {
            Ok(slot) => {
                state.stats.record_enqueue();
                info!(count, slot, "Sample written to buffer");
            }
            // Buffer closed: shutdown is underway.
            Err(_) => break,
        }
    }

    debug!("Monitor stopped");
}

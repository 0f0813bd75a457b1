//! Counter worker: simulates message arrivals.

use tracing::{debug, info, trace};

use super::PipelineState;

/// Body of one counter worker thread.
///
/// Sleeps a random interval to simulate message inter-arrival time, then
/// bumps the shared counter. No lock is held while sleeping. Exits at the
/// first sleep slice after shutdown is requested.
pub(crate) fn run(id: usize, state: &PipelineState) {
    debug!(worker = id, "Counter worker started");

    loop {
        if !state.shutdown.sleep(state.config.counter_sleep.sample()) {
            break;
        }

        info!(worker = id, "Received a message");
        trace!(worker = id, "Waiting to update the counter");
        let value = state.counter.increment();
        state.stats.record_message();
        info!(worker = id, counter = value, "Counter updated");
    }

    debug!(worker = id, "Counter worker stopped");
}

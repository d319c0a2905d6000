//! Seal progress reporting through `tracing`.

use postchain_ledger::{SealObserver, SealReport};
use tracing::{debug, info, warn};

/// Logs mining progress at debug level and a one-line pass summary at info.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SealObserver for TracingObserver {
    fn on_progress(&self, batch_index: usize, post_id: &str, attempts: u64) {
        debug!(batch_index, post_id, attempts, "mining");
    }

    fn on_batch_complete(&self, report: &SealReport) {
        let exhausted = report.exhausted().count();
        if exhausted > 0 {
            warn!(
                exhausted,
                "some posts were chained without meeting the difficulty target"
            );
        }
        info!(
            sealed = report.sealed.len(),
            remaining = report.remaining,
            attempts = report.total_attempts(),
            cancelled = report.cancelled,
            "seal pass complete"
        );
    }
}

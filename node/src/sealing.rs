//! Time-boxed seal passes.
//!
//! Mining is CPU-bound, so the pass runs on the blocking pool. When the
//! deadline passes the cancel flag is raised; the post currently being mined
//! still finishes and is saved, and the rest stay pending.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use postchain_ledger::{CancelFlag, SealReport, SharedLedger};

use crate::observer::TracingObserver;

pub async fn run_seal_pass(shared: SharedLedger, timeout: Duration) -> Result<SealReport> {
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();

    let mut handle = tokio::task::spawn_blocking(move || {
        shared.seal_pending(&TracingObserver, &worker_cancel)
    });

    let joined = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "seal deadline reached, stopping after current post"
            );
            cancel.cancel();
            handle.await
        }
    };

    let report = joined
        .context("seal worker panicked")?
        .context("failed to persist sealed posts")?;
    Ok(report)
}

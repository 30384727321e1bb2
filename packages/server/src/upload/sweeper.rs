use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::UploadAssembler;

/// Periodically remove upload sessions idle for longer than `ttl_secs`.
pub async fn run_session_sweeper(assembler: Arc<UploadAssembler>, ttl_secs: u64, interval_secs: u64) {
    let ttl = chrono::Duration::seconds(ttl_secs as i64);

    info!(ttl_secs, interval_secs, "Starting upload session sweeper");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        match assembler.sweep_expired(ttl).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Swept expired upload sessions"),
            Err(e) => error!(error = %e, "Upload session sweep failed"),
        }
    }
}

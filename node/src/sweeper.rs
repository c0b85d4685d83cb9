//! Background queue sweeper.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::BlazeService;

/// Run [`BlazeService::process_all_queues`] every `interval` until shutdown.
///
/// The first sweep runs one full interval after start.
pub fn spawn_sweeper(
    service: Arc<BlazeService>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "queue sweeper started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("queue sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match service.process_all_queues().await {
                        Ok(report) => tracing::debug!(
                            processed = report.processed.len(),
                            failed = report.failed.len(),
                            "sweep complete"
                        ),
                        Err(e) => tracing::warn!(error = %e, "queue sweep failed"),
                    }
                }
            }
        }
    })
}

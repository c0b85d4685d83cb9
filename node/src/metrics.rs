//! Prometheus metrics for the Blaze service.
//!
//! [`ServiceMetrics`] owns a dedicated [`Registry`] that the RPC `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_vec_with_registry, Encoder, Histogram, HistogramOpts, IntCounter,
    IntGaugeVec, Opts, Registry, TextEncoder,
};

pub struct ServiceMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Transfers that passed verification and were queued.
    pub transfers_accepted: IntCounter,
    /// Transfers rejected at intake (bad signature, balance, token).
    pub transfers_rejected: IntCounter,
    /// `batch-transfer` calls accepted by the node.
    pub batches_broadcast: IntCounter,
    /// Drains that failed to build, sign or broadcast.
    pub batches_failed: IntCounter,
    /// Transfers settled through accepted broadcasts.
    pub transfers_broadcast: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Last observed queue length, per token.
    pub queue_length: IntGaugeVec,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time from intake request to receipt, in milliseconds.
    pub intake_latency_ms: Histogram,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transfers_accepted = register_int_counter_with_registry!(
            Opts::new(
                "blaze_transfers_accepted_total",
                "Transfers verified and queued"
            ),
            registry
        )
        .expect("failed to register transfers_accepted counter");

        let transfers_rejected = register_int_counter_with_registry!(
            Opts::new(
                "blaze_transfers_rejected_total",
                "Transfers rejected at intake"
            ),
            registry
        )
        .expect("failed to register transfers_rejected counter");

        let batches_broadcast = register_int_counter_with_registry!(
            Opts::new(
                "blaze_batches_broadcast_total",
                "Batch transfers accepted by the chain node"
            ),
            registry
        )
        .expect("failed to register batches_broadcast counter");

        let batches_failed = register_int_counter_with_registry!(
            Opts::new("blaze_batches_failed_total", "Batch transfers that failed"),
            registry
        )
        .expect("failed to register batches_failed counter");

        let transfers_broadcast = register_int_counter_with_registry!(
            Opts::new(
                "blaze_transfers_broadcast_total",
                "Transfers included in accepted batch transfers"
            ),
            registry
        )
        .expect("failed to register transfers_broadcast counter");

        let queue_length = register_int_gauge_vec_with_registry!(
            Opts::new("blaze_queue_length", "Pending transfers per token queue"),
            &["token"],
            registry
        )
        .expect("failed to register queue_length gauge");

        // 1 ms → ~16 s
        let intake_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "blaze_intake_latency_ms",
                "Transfer intake latency in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).expect("valid buckets")),
            registry
        )
        .expect("failed to register intake_latency_ms histogram");

        Self {
            registry,
            transfers_accepted,
            transfers_rejected,
            batches_broadcast,
            batches_failed,
            transfers_broadcast,
            queue_length,
            intake_latency_ms,
        }
    }

    pub fn set_queue_length(&self, token: &str, length: u64) {
        self.queue_length
            .with_label_values(&[token])
            .set(i64::try_from(length).unwrap_or(i64::MAX));
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = ServiceMetrics::new();
        metrics.transfers_accepted.inc();
        metrics.set_queue_length("SP000.token", 3);
        let text = metrics.encode();
        assert!(text.contains("blaze_transfers_accepted_total 1"));
        assert!(text.contains("blaze_queue_length{token=\"SP000.token\"} 3"));
    }

    #[test]
    fn registries_are_independent() {
        let a = ServiceMetrics::new();
        let b = ServiceMetrics::new();
        a.batches_failed.inc();
        assert_eq!(b.batches_failed.get(), 0);
    }
}

use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and register the sentiment series,
    /// plus static gauges for the configured cache TTLs.
    pub fn init(item_ttl_ms: u64, batch_ttl_ms: u64) -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!(
            "sentiment_model_calls_total",
            "Upstream model calls issued by the analyzer."
        );
        describe_counter!(
            "sentiment_item_cache_hits_total",
            "Articles served from the per-item sentiment cache."
        );
        describe_counter!(
            "sentiment_batch_cache_hits_total",
            "Uncached subsets served from the batch result cache."
        );
        describe_counter!(
            "sentiment_full_cache_batches_total",
            "Batches answered entirely from cache (zero upstream usage)."
        );
        describe_counter!(
            "sentiment_degraded_slots_total",
            "Article slots filled with placeholder sentiment."
        );
        describe_counter!(
            "rate_limit_rejections_total",
            "Requests rejected with HTTP 429."
        );

        gauge!("sentiment_item_cache_ttl_ms").set(item_ttl_ms as f64);
        gauge!("sentiment_batch_cache_ttl_ms").set(batch_ttl_ms as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

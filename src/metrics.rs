/// Metrics and telemetry for the ENS proof service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Name cache hit/miss rates
/// - Upstream resolution outcomes and rate-limit retries
/// - Proofs generated and batch item outcomes
/// - Background cache sweeps

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== Cache Metrics ==========

    /// Name cache lookups by result (hit/miss)
    pub static ref NAME_CACHE_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ens_name_cache_lookups_total",
        "Total number of name cache lookups",
        &["result"]
    )
    .unwrap();

    /// Entries currently held by the name cache
    pub static ref NAME_CACHE_SIZE: IntGauge = register_int_gauge!(
        "ens_name_cache_size",
        "Number of entries in the name cache after the last sweep"
    )
    .unwrap();

    /// Expired entries removed by the background sweep
    pub static ref NAME_CACHE_EVICTIONS_TOTAL: IntCounter = register_int_counter!(
        "ens_name_cache_evictions_total",
        "Total number of expired name cache entries swept"
    )
    .unwrap();

    // ========== Upstream Metrics ==========

    /// Upstream name resolutions by outcome
    pub static ref NAME_RESOLUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ens_name_resolutions_total",
        "Total number of upstream name resolutions",
        &["outcome"]
    )
    .unwrap();

    /// Retries caused by upstream rate limiting
    pub static ref RESOLVE_RETRIES_TOTAL: IntCounter = register_int_counter!(
        "ens_resolve_retries_total",
        "Total number of rate-limit retries against the upstream"
    )
    .unwrap();

    // ========== Proof Metrics ==========

    /// Proofs generated
    pub static ref PROOFS_GENERATED_TOTAL: IntCounter = register_int_counter!(
        "proofs_generated_total",
        "Total number of proofs generated"
    )
    .unwrap();

    /// Batch items by result code
    pub static ref BATCH_ITEMS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "proof_batch_items_total",
        "Total number of batch items processed by result code",
        &["code"]
    )
    .unwrap();
}

/// Render all registered metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a name cache lookup
pub fn record_cache_access(hit: bool) {
    NAME_CACHE_LOOKUPS_TOTAL
        .with_label_values(&[if hit { "hit" } else { "miss" }])
        .inc();
}

/// Record the outcome of a background sweep
pub fn record_cache_sweep(evicted: usize, remaining: usize) {
    NAME_CACHE_EVICTIONS_TOTAL.inc_by(evicted as u64);
    NAME_CACHE_SIZE.set(remaining as i64);
}

/// Record an upstream name resolution
pub fn record_name_resolution(outcome: &str) {
    NAME_RESOLUTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a rate-limit retry
pub fn record_resolve_retry() {
    RESOLVE_RETRIES_TOTAL.inc();
}

pub fn record_proof_generated() {
    PROOFS_GENERATED_TOTAL.inc();
}

/// Record a batch item by its result code
pub fn record_batch_item(code: &str) {
    BATCH_ITEMS_TOTAL.with_label_values(&[code]).inc();
}

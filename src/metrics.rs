/// Metrics and telemetry
///
/// Prometheus-compatible counters for the operational surface.
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Sign-in attempts by outcome
    pub static ref SIGNIN_TOTAL: IntCounterVec = register_int_counter_vec!(
        "himpun_signin_total",
        "Total sign-in attempts",
        &["outcome"]
    )
    .unwrap();

    /// Documents signed
    pub static ref DOCUMENTS_SIGNED_TOTAL: IntCounter = register_int_counter!(
        "himpun_documents_signed_total",
        "Total documents signed"
    )
    .unwrap();

    /// Events appended to the broadcast log
    pub static ref EVENTS_PUBLISHED_TOTAL: IntCounter = register_int_counter!(
        "himpun_events_published_total",
        "Total events published to the stream"
    )
    .unwrap();
}

/// Render all registered metrics in Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

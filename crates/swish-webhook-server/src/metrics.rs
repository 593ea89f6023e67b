use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::sync::LazyLock;

/// Verification outcomes, labelled `accepted` or by failure reason.
pub static VERIFICATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "swish_webhook_verifications_total",
        "Webhook verification outcomes",
        &["result"]
    )
    .unwrap()
});

pub static VERIFY_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "swish_webhook_verify_duration_seconds",
        "Webhook verification latency in seconds, including the nonce claim",
        vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05, 0.25, 1.0, 2.5]
    )
    .unwrap()
});

pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

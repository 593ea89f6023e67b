use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use ::swish_webhook::{
    FailureReason, VerifierOptions, WebhookHeaders, NONCE_HEADER_ALIASES,
    SIGNATURE_HEADER_ALIASES, TIMESTAMP_HEADER_ALIASES,
};

use crate::metrics;
use crate::state::AppState;

/// Seconds a sender should wait before retrying after a store outage.
pub const RETRY_AFTER_SECS: &str = "5";

/// Whether `name` is one the verifier reads, configured or alias.
fn is_verification_header(name: &str, opts: &VerifierOptions) -> bool {
    [
        opts.signature_header.as_str(),
        opts.timestamp_header.as_str(),
        opts.nonce_header.as_str(),
    ]
    .into_iter()
    .chain(SIGNATURE_HEADER_ALIASES.iter().copied())
    .chain(TIMESTAMP_HEADER_ALIASES.iter().copied())
    .chain(NONCE_HEADER_ALIASES.iter().copied())
    .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Collapse the request headers to one value per name, keeping the first.
///
/// Values that are not visible ASCII are skipped, which makes the header count as
/// absent rather than guessing at an encoding.
fn collect_headers(req: &HttpRequest, opts: &VerifierOptions) -> WebhookHeaders {
    let mut headers = WebhookHeaders::new();
    for (name, value) in req.headers().iter() {
        match value.to_str() {
            Ok(value) => headers.insert(name.as_str(), value),
            Err(_) if is_verification_header(name.as_str(), opts) => {
                tracing::debug!(
                    header = %name,
                    value_len = value.len(),
                    "skipping verification header with non-visible-ASCII value"
                );
            }
            Err(_) => {}
        }
    }
    headers
}

fn rejection(reason: FailureReason) -> HttpResponse {
    if reason.is_retriable() {
        HttpResponse::ServiceUnavailable()
            .insert_header(("Retry-After", RETRY_AFTER_SECS))
            .json(serde_json::json!({
                "error": "webhook verification temporarily unavailable"
            }))
    } else {
        HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "webhook verification failed"
        }))
    }
}

/// Verify an inbound Swish webhook over the exact bytes received.
#[post("/webhook/swish")]
pub async fn swish_webhook(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    let headers = collect_headers(&req, state.verifier.options());

    let start = std::time::Instant::now();
    let result = state.verifier.verify(&body, &headers, Utc::now()).await;
    metrics::VERIFY_LATENCY.observe(start.elapsed().as_secs_f64());

    match result.reason {
        None => {
            metrics::VERIFICATIONS
                .with_label_values(&["accepted"])
                .inc();
            tracing::info!(bytes = body.len(), "swish webhook accepted");
            HttpResponse::Ok().json(serde_json::json!({ "received": true }))
        }
        Some(reason) => {
            metrics::VERIFICATIONS
                .with_label_values(&[reason.as_str()])
                .inc();
            rejection(reason)
        }
    }
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "swish-webhook-server",
        "nonceStore": state.nonce_backend,
    }))
}

/// Constant-time byte comparison. Delegates to the shared implementation
/// in swish_webhook::security which uses the `subtle` crate.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    ::swish_webhook::security::constant_time_eq(a, b)
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| constant_time_eq(t.as_bytes(), token))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None if !state.public_metrics => {
            return HttpResponse::Forbidden().json(serde_json::json!({
                "error": "forbidden",
                "message": "Set METRICS_TOKEN or SWISH_PUBLIC_METRICS=true to access /metrics"
            }));
        }
        None => {}
    }
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}

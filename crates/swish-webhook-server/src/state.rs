use swish_webhook::Verifier;

/// Shared application state for the webhook server.
pub struct AppState {
    /// Built once at startup; holds the secret and the nonce store.
    pub verifier: Verifier,
    /// Backend name reported by /health.
    pub nonce_backend: &'static str,
    /// Separate bearer token for /metrics (never the webhook secret).
    pub metrics_token: Option<Vec<u8>>,
    /// Serve /metrics unauthenticated when no token is configured.
    pub public_metrics: bool,
}

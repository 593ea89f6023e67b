//! HTTP front for [`swish_webhook`]: reads configuration from the environment, builds
//! the verifier and nonce store once, and guards the webhook route with it.
//!
//! # Modules
//!
//! - [`config`]: [`ServerConfig`](config::ServerConfig) loaded from env / `.env`
//! - [`routes`]: HTTP endpoints (webhook, health, metrics)
//! - [`state`]: Shared [`AppState`](state::AppState)
//! - [`metrics`]: Prometheus metrics for verification outcomes

pub mod config;
pub mod metrics;
pub mod routes;
pub mod state;

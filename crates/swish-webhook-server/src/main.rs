use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swish_webhook::Verifier;
use swish_webhook_server::config::ServerConfig;
use swish_webhook_server::routes;
use swish_webhook_server::state::AppState;

/// Largest webhook body accepted, in bytes.
const MAX_BODY_BYTES: usize = 256 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            tracing::error!(
                "SWISH_WEBHOOK_SECRET is required. Set it to the secret shared with Swish \
                 (for local development any non-blank value works)."
            );
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "loaded configuration");

    if config.verifier.shared_secret.len() < 32 {
        tracing::warn!(
            "SWISH_WEBHOOK_SECRET is only {} bytes (minimum 32 recommended)",
            config.verifier.shared_secret.len()
        );
    }

    let nonce_store = match config.nonce_backend.build() {
        Ok(store) => store,
        Err(e) => {
            // No silent fallback: a different backend would change replay guarantees.
            tracing::error!(
                backend = config.nonce_backend.name(),
                error = %e,
                "failed to build nonce store"
            );
            std::process::exit(1);
        }
    };
    if !config.nonce_backend.is_shared() {
        tracing::warn!(
            "Nonce store is in-memory: replay protection is per-process and lost on restart. \
             Set SWISH_REDIS or SWISH_NONCE_DB_PATH for multi-instance deployments."
        );
    }

    let verifier = match Verifier::new(config.verifier.clone(), nonce_store) {
        Ok(verifier) => verifier,
        Err(e) => {
            tracing::error!(error = %e, "invalid verifier configuration");
            std::process::exit(1);
        }
    };

    if config.metrics_token.is_none() && config.public_metrics {
        tracing::warn!("METRICS_TOKEN not set and SWISH_PUBLIC_METRICS enabled: /metrics is public");
    }

    let state = web::Data::new(AppState {
        verifier,
        nonce_backend: config.nonce_backend.name(),
        metrics_token: config.metrics_token.clone().map(String::into_bytes),
        public_metrics: config.public_metrics,
    });

    let port = config.port;
    tracing::info!("Swish webhook receiver listening on port {port}");
    tracing::info!("Nonce store: {}", config.nonce_backend.name());
    tracing::info!("  POST http://localhost:{port}/webhook/swish");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .service(routes::health)
            .service(routes::metrics_endpoint)
            .service(routes::swish_webhook)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

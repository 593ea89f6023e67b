use std::env;
use std::time::Duration;

use swish_webhook::{
    ConfigError, NonceBackend, SignatureEncoding, TimestampPolicy, VerifierOptions,
    DEFAULT_REDIS_KEY_PREFIX, DEFAULT_SWEEP_INTERVAL,
};

const DEFAULT_PORT: u16 = 8080;

/// Connection-string variables, highest priority first.
pub const REDIS_URL_VARS: &[&str] = &["SWISH_REDIS", "SWISH_REDIS_CONN", "REDIS_URL"];

#[derive(Clone)]
pub struct ServerConfig {
    /// Verifier settings, including the shared secret.
    pub verifier: VerifierOptions,
    /// Which nonce store to build.
    pub nonce_backend: NonceBackend,
    /// Bearer token required for /metrics
    pub metrics_token: Option<String>,
    /// Serve /metrics without a token when none is configured
    pub public_metrics: bool,
    pub port: u16,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("verifier", &self.verifier)
            // Connection strings can carry credentials.
            .field("nonce_backend", &self.nonce_backend.name())
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_metrics", &self.public_metrics)
            .field("port", &self.port)
            .finish()
    }
}

impl ServerConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // Required: shared secret
        let secret = var("SWISH_WEBHOOK_SECRET").ok_or(ConfigError::MissingSecret)?;
        let mut verifier = VerifierOptions::new(secret);

        if let Some(secs) = parse_var::<u64>(&var, "SWISH_ALLOWED_SKEW_SECS")? {
            verifier = verifier.with_allowed_clock_skew(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64>(&var, "SWISH_MAX_MESSAGE_AGE_SECS")? {
            verifier = verifier.with_max_message_age(Duration::from_secs(secs));
        }
        if let Some(ms) = parse_var::<u64>(&var, "SWISH_STORE_TIMEOUT_MS")? {
            verifier = verifier.with_store_timeout(Duration::from_millis(ms));
        }

        // Optional: header name overrides. The built-in aliases still apply after these.
        if let Some(name) = var("SWISH_SIGNATURE_HEADER") {
            verifier.signature_header = name;
        }
        if let Some(name) = var("SWISH_TIMESTAMP_HEADER") {
            verifier.timestamp_header = name;
        }
        if let Some(name) = var("SWISH_NONCE_HEADER") {
            verifier.nonce_header = name;
        }

        if parse_flag(&var, "SWISH_STRICT_TIMESTAMPS")? {
            verifier = verifier.with_timestamp_policy(TimestampPolicy::UnixSecondsStrict);
        }
        if let Some(raw) = var("SWISH_SIGNATURE_ENCODING") {
            let encoding: SignatureEncoding =
                raw.parse().map_err(|_| ConfigError::InvalidValue {
                    name: "SWISH_SIGNATURE_ENCODING",
                    value: raw.clone(),
                })?;
            verifier = verifier.with_signature_encoding(encoding);
        }

        let sweep_interval = parse_var::<u64>(&var, "SWISH_NONCE_SWEEP_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL);

        // Backend: Redis if any connection string is set, then SQLite, then in-memory.
        let nonce_backend = match REDIS_URL_VARS.iter().find_map(|name| var(*name)) {
            Some(url) => NonceBackend::Redis {
                url,
                key_prefix: var("SWISH_REDIS_PREFIX")
                    .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_string()),
            },
            None => match var("SWISH_NONCE_DB_PATH") {
                Some(path) => NonceBackend::Sqlite {
                    path,
                    sweep_interval,
                },
                None => NonceBackend::InMemory { sweep_interval },
            },
        };

        let metrics_token = var("METRICS_TOKEN");
        let public_metrics = parse_flag(&var, "SWISH_PUBLIC_METRICS")?;

        let port = parse_var::<u16>(&var, "PORT")?.unwrap_or(DEFAULT_PORT);

        Ok(Self {
            verifier,
            nonce_backend,
            metrics_token,
            public_metrics,
            port,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(None),
    }
}

fn parse_flag(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<bool, ConfigError> {
    match var(name).as_deref().map(str::trim) {
        None => Ok(false),
        Some("1" | "true" | "TRUE" | "True" | "yes") => Ok(true),
        Some("0" | "false" | "FALSE" | "False" | "no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            name,
            value: other.to_string(),
        }),
    }
}

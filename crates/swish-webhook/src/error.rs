use std::time::Duration;

use thiserror::Error;

/// Errors raised while building a verifier or a nonce store.
///
/// These fail fast at startup; per-request failures are reported through
/// [`VerifyResult`](crate::VerifyResult) instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("shared secret must be set and non-blank")]
    MissingSecret,

    #[error("invalid duration for {name}: {reason}")]
    InvalidDuration { name: &'static str, reason: String },

    #[error("missing required setting: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("nonce store backend error: {0}")]
    Backend(String),
}

/// Errors returned by a [`NonceStore`](crate::nonce_store::NonceStore) that could not
/// decide whether a nonce was fresh.
///
/// Never conflate these with a replay: the store was not consulted successfully.
#[derive(Debug, Error)]
pub enum NonceStoreError {
    #[error("nonce store unavailable: {0}")]
    Unavailable(String),

    #[error("nonce store did not answer within {0:?}")]
    Timeout(Duration),
}

//! Authenticity and anti-replay verification for Swish payment webhooks.
//!
//! Every delivery carries three headers: a timestamp, a single-use nonce and an
//! HMAC-SHA256 signature over `timestamp + "\n" + nonce + "\n" + body`. A request
//! is accepted only when all of these hold:
//!
//! - the timestamp parses and lies inside the clock-skew and message-age windows
//! - the signature matches (compared in constant time)
//! - the nonce has not been claimed before in any instance sharing the store
//!
//! # Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use swish_webhook::{InMemoryNonceStore, Verifier, VerifierOptions, WebhookHeaders};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let verifier = Verifier::new(
//!     VerifierOptions::new("dev_secret"),
//!     Arc::new(InMemoryNonceStore::new()),
//! )
//! .unwrap();
//!
//! let mut headers = WebhookHeaders::new();
//! headers.insert("X-Swish-Timestamp", "1757962690");
//! headers.insert("X-Swish-Nonce", "0123456789abcdef");
//! headers.insert("X-Swish-Signature", "...");
//!
//! let result = verifier.verify(b"{}", &headers, Utc::now()).await;
//! if !result.success {
//!     eprintln!("rejected: {:?}", result.reason);
//! }
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod headers;
pub mod hmac;
pub mod nonce_store;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod security;
pub mod timestamp;
pub mod verifier;

// Re-exports
pub use constants::*;
pub use error::{ConfigError, NonceStoreError};
pub use headers::WebhookHeaders;
pub use crate::hmac::{canonical_message, sign, sign_base64, sign_hex, SignatureEncoding};
pub use nonce_store::{start_sweeper, InMemoryNonceStore, NonceBackend, NonceStore};
#[cfg(feature = "sqlite")]
pub use nonce_store::SqliteNonceStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisNonceStore;
pub use timestamp::{parse_timestamp, TimestampPolicy};
pub use verifier::{FailureReason, Verifier, VerifierOptions, VerifyResult};

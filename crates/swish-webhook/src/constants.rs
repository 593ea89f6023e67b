use std::time::Duration;

/// Primary header carrying the HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "X-Swish-Signature";

/// Primary header carrying the sender's timestamp.
pub const TIMESTAMP_HEADER: &str = "X-Swish-Timestamp";

/// Primary header carrying the per-message nonce.
pub const NONCE_HEADER: &str = "X-Swish-Nonce";

/// Fallback names tried after the configured header, in order.
pub const SIGNATURE_HEADER_ALIASES: &[&str] = &[SIGNATURE_HEADER, "X-Signature"];
pub const TIMESTAMP_HEADER_ALIASES: &[&str] = &[TIMESTAMP_HEADER, "X-Timestamp"];
pub const NONCE_HEADER_ALIASES: &[&str] = &[NONCE_HEADER, "X-Nonce"];

/// Default tolerated difference between sender and receiver clocks.
pub const DEFAULT_ALLOWED_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Default maximum age of an accepted message. Also the nonce retention window.
pub const DEFAULT_MAX_MESSAGE_AGE: Duration = Duration::from_secs(10 * 60);

/// Default upper bound on a single nonce-store claim.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default interval of the in-memory expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default key prefix for nonces kept in a shared key/value store.
pub const DEFAULT_REDIS_KEY_PREFIX: &str = "swish:nonce:";

/// Length in bytes of an HMAC-SHA256 tag.
pub const SIGNATURE_LEN: usize = 32;

/// Numeric timestamps with at least this many digits are read as milliseconds.
pub const MILLIS_DIGIT_THRESHOLD: usize = 13;

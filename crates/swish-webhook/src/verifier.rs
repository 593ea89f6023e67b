//! Webhook verification: headers, freshness, signature, then nonce claim.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ALLOWED_CLOCK_SKEW, DEFAULT_MAX_MESSAGE_AGE, DEFAULT_STORE_TIMEOUT,
    NONCE_HEADER, NONCE_HEADER_ALIASES, SIGNATURE_HEADER, SIGNATURE_HEADER_ALIASES,
    TIMESTAMP_HEADER, TIMESTAMP_HEADER_ALIASES,
};
use crate::error::{ConfigError, NonceStoreError};
use crate::headers::WebhookHeaders;
use crate::hmac::{verify_signature, SignatureEncoding};
use crate::nonce_store::NonceStore;
use crate::timestamp::{parse_timestamp, TimestampPolicy};

/// Immutable verifier configuration.
#[derive(Clone)]
pub struct VerifierOptions {
    /// Shared HMAC secret. Required, non-blank.
    pub shared_secret: Vec<u8>,
    /// Maximum `|now - timestamp|`.
    pub allowed_clock_skew: Duration,
    /// Maximum `now - timestamp`; also the minimum time a claimed nonce is retained.
    pub max_message_age: Duration,
    /// Header tried first for the signature, before the built-in aliases.
    pub signature_header: String,
    pub timestamp_header: String,
    pub nonce_header: String,
    pub timestamp_policy: TimestampPolicy,
    pub signature_encoding: SignatureEncoding,
    /// Upper bound on a single nonce-store claim. Exceeding it fails closed.
    pub store_timeout: Duration,
}

impl VerifierOptions {
    pub fn new(shared_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            shared_secret: shared_secret.into(),
            allowed_clock_skew: DEFAULT_ALLOWED_CLOCK_SKEW,
            max_message_age: DEFAULT_MAX_MESSAGE_AGE,
            signature_header: SIGNATURE_HEADER.to_string(),
            timestamp_header: TIMESTAMP_HEADER.to_string(),
            nonce_header: NONCE_HEADER.to_string(),
            timestamp_policy: TimestampPolicy::default(),
            signature_encoding: SignatureEncoding::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_allowed_clock_skew(mut self, skew: Duration) -> Self {
        self.allowed_clock_skew = skew;
        self
    }

    pub fn with_max_message_age(mut self, age: Duration) -> Self {
        self.max_message_age = age;
        self
    }

    pub fn with_header_names(
        mut self,
        signature: impl Into<String>,
        timestamp: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        self.signature_header = signature.into();
        self.timestamp_header = timestamp.into();
        self.nonce_header = nonce.into();
        self
    }

    pub fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    pub fn with_signature_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.signature_encoding = encoding;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

impl fmt::Debug for VerifierOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierOptions")
            .field("shared_secret", &"[REDACTED]")
            .field("allowed_clock_skew", &self.allowed_clock_skew)
            .field("max_message_age", &self.max_message_age)
            .field("signature_header", &self.signature_header)
            .field("timestamp_header", &self.timestamp_header)
            .field("nonce_header", &self.nonce_header)
            .field("timestamp_policy", &self.timestamp_policy)
            .field("signature_encoding", &self.signature_encoding)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

/// Why a webhook was rejected. The string forms are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    MissingHeader,
    InvalidTimestamp,
    ClockSkew,
    MessageTooOld,
    Replay,
    SignatureMismatch,
    StoreUnavailable,
}

impl FailureReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing-header",
            Self::InvalidTimestamp => "invalid-timestamp",
            Self::ClockSkew => "clock-skew",
            Self::MessageTooOld => "message-too-old",
            Self::Replay => "replay",
            Self::SignatureMismatch => "signature-mismatch",
            Self::StoreUnavailable => "store-unavailable",
        }
    }

    /// Only a store outage is worth retrying; every other verdict is final.
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Verifier::verify`]. Never carries the secret or any signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifyResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl VerifyResult {
    pub const fn ok() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    pub const fn fail(reason: FailureReason) -> Self {
        Self {
            success: false,
            reason: Some(reason),
        }
    }
}

/// Verifies inbound webhooks against a shared secret and a nonce store.
///
/// `verify` is a function of its inputs and this immutable configuration; the
/// current time is always passed in by the caller.
pub struct Verifier {
    options: VerifierOptions,
    allowed_skew: TimeDelta,
    max_age: TimeDelta,
    store: Arc<dyn NonceStore>,
}

impl Verifier {
    /// Validate `options` and build a verifier. Fails fast on a blank secret or a
    /// zero/out-of-range duration.
    pub fn new(options: VerifierOptions, store: Arc<dyn NonceStore>) -> Result<Self, ConfigError> {
        if options.shared_secret.is_empty()
            || options.shared_secret.iter().all(u8::is_ascii_whitespace)
        {
            return Err(ConfigError::MissingSecret);
        }
        let allowed_skew = to_time_delta(options.allowed_clock_skew, "allowed_clock_skew")?;
        let max_age = to_time_delta(options.max_message_age, "max_message_age")?;
        if options.store_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration {
                name: "store_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }

        if allowed_skew > max_age {
            tracing::warn!(
                allowed_clock_skew_secs = options.allowed_clock_skew.as_secs(),
                max_message_age_secs = options.max_message_age.as_secs(),
                "clock skew exceeds max message age; future-dated messages are held past max_message_age"
            );
        }

        Ok(Self {
            options,
            allowed_skew,
            max_age,
            store,
        })
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Verify one webhook delivery.
    ///
    /// Checks run in order and stop at the first failure: required headers,
    /// timestamp parsing, message age, clock skew, signature, nonce claim. The nonce
    /// is only consumed once the request has proven knowledge of the secret, so a
    /// forger cannot burn a legitimate sender's nonce.
    pub async fn verify(
        &self,
        body: &[u8],
        headers: &WebhookHeaders,
        now: DateTime<Utc>,
    ) -> VerifyResult {
        let opts = &self.options;

        let signature = headers.first_non_blank(
            std::iter::once(opts.signature_header.as_str())
                .chain(SIGNATURE_HEADER_ALIASES.iter().copied()),
        );
        // A present but blank timestamp is handed to the parser, which rejects it as
        // invalid rather than missing.
        let timestamp_names = || {
            std::iter::once(opts.timestamp_header.as_str())
                .chain(TIMESTAMP_HEADER_ALIASES.iter().copied())
        };
        let timestamp = headers
            .first_non_blank(timestamp_names())
            .or_else(|| headers.first_present(timestamp_names()));
        let nonce = headers.first_non_blank(
            std::iter::once(opts.nonce_header.as_str()).chain(NONCE_HEADER_ALIASES.iter().copied()),
        );

        let (Some(signature), Some(timestamp), Some(nonce)) = (signature, timestamp, nonce) else {
            tracing::warn!(
                has_signature = signature.is_some(),
                has_timestamp = timestamp.is_some(),
                has_nonce = nonce.is_some(),
                "webhook rejected: missing header"
            );
            return VerifyResult::fail(FailureReason::MissingHeader);
        };

        let Some(sent_at) = parse_timestamp(timestamp, opts.timestamp_policy) else {
            return self.reject(FailureReason::InvalidTimestamp, nonce);
        };

        // Two independent bounds. Age only looks backwards, so anything older than
        // max_message_age is reported as too old even when it is also outside the skew.
        let delta = now.signed_duration_since(sent_at);
        if delta > self.max_age {
            return self.reject(FailureReason::MessageTooOld, nonce);
        }
        if delta.abs() > self.allowed_skew {
            return self.reject(FailureReason::ClockSkew, nonce);
        }

        if !verify_signature(
            &opts.shared_secret,
            timestamp,
            nonce,
            body,
            signature,
            opts.signature_encoding,
        ) {
            return self.reject(FailureReason::SignatureMismatch, nonce);
        }

        let expires_at = self.nonce_expiry(now, sent_at);
        let claim = match tokio::time::timeout(
            opts.store_timeout,
            self.store.try_claim(nonce, expires_at, now),
        )
        .await
        {
            Ok(claim) => claim,
            Err(_) => Err(NonceStoreError::Timeout(opts.store_timeout)),
        };

        match claim {
            Ok(true) => {
                tracing::debug!(nonce = %format!("{:.8}", nonce), "webhook verified");
                VerifyResult::ok()
            }
            Ok(false) => self.reject(FailureReason::Replay, nonce),
            Err(e) => {
                tracing::error!(error = %e, "nonce store claim failed");
                self.reject(FailureReason::StoreUnavailable, nonce)
            }
        }
    }

    /// Instant until which a claimed nonce stays unavailable.
    ///
    /// A message passes the window checks until `sent_at + min(skew, max_age)`, which
    /// for a future-dated message can be later than `now + max_age`. The claim must
    /// outlive both, so a replay at the last fresh instant is still caught.
    fn nonce_expiry(&self, now: DateTime<Utc>, sent_at: DateTime<Utc>) -> DateTime<Utc> {
        let by_age = now.checked_add_signed(self.max_age);
        let by_skew = sent_at.checked_add_signed(self.allowed_skew);
        by_age
            .zip(by_skew)
            .and_then(|(age, skew)| age.max(skew).checked_add_signed(TimeDelta::seconds(1)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn reject(&self, reason: FailureReason, nonce: &str) -> VerifyResult {
        tracing::warn!(
            reason = reason.as_str(),
            nonce = %format!("{:.8}", nonce),
            "webhook rejected"
        );
        VerifyResult::fail(reason)
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn to_time_delta(value: Duration, name: &'static str) -> Result<TimeDelta, ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidDuration {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    TimeDelta::from_std(value).map_err(|e| ConfigError::InvalidDuration {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmac::{sign_base64, sign_hex};
    use crate::nonce_store::InMemoryNonceStore;
    use async_trait::async_trait;

    const SECRET: &str = "dev_secret";
    const BODY: &[u8] = br#"{"id":"abc123","amount":100}"#;
    const NONCE: &str = "0123456789abcdef0123456789abcdef";

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_757_962_690, 0).unwrap()
    }

    fn verifier() -> Verifier {
        let options = VerifierOptions::new(SECRET)
            .with_allowed_clock_skew(Duration::from_secs(300))
            .with_max_message_age(Duration::from_secs(600));
        Verifier::new(options, Arc::new(InMemoryNonceStore::new())).unwrap()
    }

    fn signed(ts: &str, nonce: &str, body: &[u8]) -> WebhookHeaders {
        let sig = sign_base64(SECRET.as_bytes(), ts, nonce, body);
        [
            ("X-Swish-Timestamp", ts.to_string()),
            ("X-Swish-Nonce", nonce.to_string()),
            ("X-Swish-Signature", sig),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn accepts_valid_request() {
        let ts = now().timestamp().to_string();
        let result = verifier().verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert_eq!(result, VerifyResult::ok());
    }

    #[tokio::test]
    async fn second_delivery_is_replay() {
        let v = verifier();
        let ts = now().timestamp().to_string();
        let headers = signed(&ts, NONCE, BODY);

        assert!(v.verify(BODY, &headers, now()).await.success);
        assert_eq!(
            v.verify(BODY, &headers, now()).await.reason,
            Some(FailureReason::Replay)
        );
    }

    fn headers_with(blanked: &str, value: &str) -> WebhookHeaders {
        let ts = now().timestamp().to_string();
        let sig = sign_base64(SECRET.as_bytes(), &ts, NONCE, BODY);
        [
            ("X-Swish-Timestamp", ts),
            ("X-Swish-Nonce", NONCE.to_string()),
            ("X-Swish-Signature", sig),
        ]
        .into_iter()
        .map(|(k, v)| if k == blanked { (k, value.to_string()) } else { (k, v) })
        .collect()
    }

    #[tokio::test]
    async fn blank_signature_or_nonce_is_missing_header() {
        let v = verifier();
        for blanked in ["X-Swish-Nonce", "X-Swish-Signature"] {
            for value in ["", " "] {
                let result = v.verify(BODY, &headers_with(blanked, value), now()).await;
                assert_eq!(result.reason, Some(FailureReason::MissingHeader), "{blanked}");
            }
        }
    }

    #[tokio::test]
    async fn blank_timestamp_is_invalid_not_missing() {
        let v = verifier();
        for value in ["", "  "] {
            let result = v
                .verify(BODY, &headers_with("X-Swish-Timestamp", value), now())
                .await;
            assert_eq!(result.reason, Some(FailureReason::InvalidTimestamp), "{value:?}");
        }
    }

    #[tokio::test]
    async fn absent_timestamp_is_missing_header() {
        let ts = now().timestamp().to_string();
        let headers: WebhookHeaders = [
            ("X-Swish-Nonce", NONCE.to_string()),
            ("X-Swish-Signature", sign_base64(SECRET.as_bytes(), &ts, NONCE, BODY)),
        ]
        .into_iter()
        .collect();
        let result = verifier().verify(BODY, &headers, now()).await;
        assert_eq!(result.reason, Some(FailureReason::MissingHeader));
    }

    #[tokio::test]
    async fn blank_primary_falls_through_to_alias() {
        let ts = now().timestamp().to_string();
        let headers: WebhookHeaders = [
            ("X-Swish-Timestamp", String::new()),
            ("X-Timestamp", ts.clone()),
            ("X-Swish-Nonce", NONCE.to_string()),
            ("X-Swish-Signature", " ".to_string()),
            ("X-Signature", sign_base64(SECRET.as_bytes(), &ts, NONCE, BODY)),
        ]
        .into_iter()
        .collect();
        assert!(verifier().verify(BODY, &headers, now()).await.success);
    }

    #[tokio::test]
    async fn unparseable_timestamp() {
        let v = verifier();
        for ts in ["not-a-number", "12:00", "2025-99-99"] {
            let result = v.verify(BODY, &signed(ts, NONCE, BODY), now()).await;
            assert_eq!(result.reason, Some(FailureReason::InvalidTimestamp), "{ts}");
        }
    }

    #[tokio::test]
    async fn future_timestamp_within_skew_is_accepted() {
        let ts = (now() + TimeDelta::minutes(4)).timestamp().to_string();
        let result = verifier().verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn future_timestamp_beyond_skew_is_rejected() {
        let ts = (now() + TimeDelta::minutes(6)).timestamp().to_string();
        let result = verifier().verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert_eq!(result.reason, Some(FailureReason::ClockSkew));
    }

    #[tokio::test]
    async fn age_bound_applies_even_when_skew_would_pass() {
        let options = VerifierOptions::new(SECRET)
            .with_allowed_clock_skew(Duration::from_secs(600))
            .with_max_message_age(Duration::from_secs(120));
        let v = Verifier::new(options, Arc::new(InMemoryNonceStore::new())).unwrap();

        let ts = (now() - TimeDelta::minutes(3)).timestamp().to_string();
        let result = v.verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert_eq!(result.reason, Some(FailureReason::MessageTooOld));

        // A future-dated message is never "too old".
        let ts = (now() + TimeDelta::minutes(9)).timestamp().to_string();
        let result = v.verify(BODY, &signed(&ts, "other-nonce", BODY), now()).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn old_message_reports_age_even_beyond_skew() {
        let ts = (now() - TimeDelta::minutes(15)).timestamp().to_string();
        let result = verifier().verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert_eq!(result.reason, Some(FailureReason::MessageTooOld));

        // Older than the skew but inside the age bound.
        let ts = (now() - TimeDelta::minutes(7)).timestamp().to_string();
        let result = verifier().verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert_eq!(result.reason, Some(FailureReason::ClockSkew));
    }

    #[tokio::test]
    async fn future_dated_message_replayed_at_end_of_window() {
        let v = verifier();
        let ts = (now() + TimeDelta::minutes(5)).timestamp().to_string();
        let headers = signed(&ts, NONCE, BODY);

        assert!(v.verify(BODY, &headers, now()).await.success);
        // Still inside both windows: dated 5 minutes ago, skew 5, age 10.
        let later = now() + TimeDelta::minutes(10);
        assert_eq!(
            v.verify(BODY, &headers, later).await.reason,
            Some(FailureReason::Replay)
        );
    }

    #[tokio::test]
    async fn wide_skew_keeps_nonce_until_message_goes_stale() {
        let options = VerifierOptions::new(SECRET)
            .with_allowed_clock_skew(Duration::from_secs(8 * 60))
            .with_max_message_age(Duration::from_secs(10 * 60));
        let v = Verifier::new(options, Arc::new(InMemoryNonceStore::new())).unwrap();
        let ts = (now() + TimeDelta::minutes(8)).timestamp().to_string();
        let headers = signed(&ts, NONCE, BODY);

        assert!(v.verify(BODY, &headers, now()).await.success);
        for minutes in [12, 16] {
            let later = now() + TimeDelta::minutes(minutes);
            assert_eq!(
                v.verify(BODY, &headers, later).await.reason,
                Some(FailureReason::Replay),
                "+{minutes}min"
            );
        }
        let stale = now() + TimeDelta::minutes(16) + TimeDelta::seconds(1);
        assert_eq!(
            v.verify(BODY, &headers, stale).await.reason,
            Some(FailureReason::ClockSkew)
        );
    }

    #[test]
    fn skew_wider_than_age_is_accepted() {
        let options = VerifierOptions::new(SECRET)
            .with_allowed_clock_skew(Duration::from_secs(900))
            .with_max_message_age(Duration::from_secs(600));
        assert!(Verifier::new(options, Arc::new(InMemoryNonceStore::new())).is_ok());
    }

    #[tokio::test]
    async fn tampered_body_is_signature_mismatch() {
        let ts = now().timestamp().to_string();
        let headers = signed(&ts, NONCE, BODY);
        let result = verifier()
            .verify(br#"{"id":"abc123","amount":900}"#, &headers, now())
            .await;
        assert_eq!(result.reason, Some(FailureReason::SignatureMismatch));
    }

    #[tokio::test]
    async fn forged_request_does_not_burn_nonce() {
        let v = verifier();
        let ts = now().timestamp().to_string();

        let forged: WebhookHeaders = [
            ("X-Swish-Timestamp", ts.clone()),
            ("X-Swish-Nonce", NONCE.to_string()),
            ("X-Swish-Signature", sign_base64(b"guessed", &ts, NONCE, BODY)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            v.verify(BODY, &forged, now()).await.reason,
            Some(FailureReason::SignatureMismatch)
        );

        let genuine = signed(&ts, NONCE, BODY);
        assert!(v.verify(BODY, &genuine, now()).await.success);
    }

    #[tokio::test]
    async fn hex_signature_accepted_under_auto() {
        let ts = now().timestamp().to_string();
        let headers: WebhookHeaders = [
            ("X-Swish-Timestamp", ts.clone()),
            ("X-Swish-Nonce", NONCE.to_string()),
            ("X-Swish-Signature", sign_hex(SECRET.as_bytes(), &ts, NONCE, BODY)),
        ]
        .into_iter()
        .collect();
        assert!(verifier().verify(BODY, &headers, now()).await.success);
    }

    #[tokio::test]
    async fn custom_primary_header_names_take_precedence() {
        let options = VerifierOptions::new(SECRET).with_header_names("Sig", "Ts", "Nonce");
        let v = Verifier::new(options, Arc::new(InMemoryNonceStore::new())).unwrap();
        let ts = now().timestamp().to_string();
        let good = sign_base64(SECRET.as_bytes(), &ts, NONCE, BODY);

        let headers: WebhookHeaders = [
            ("sig", good),
            ("X-Swish-Signature", "wrong".to_string()),
            ("ts", ts.clone()),
            ("nonce", NONCE.to_string()),
        ]
        .into_iter()
        .collect();
        assert!(v.verify(BODY, &headers, now()).await.success);
    }

    #[tokio::test]
    async fn strict_policy_rejects_iso_timestamps() {
        let options =
            VerifierOptions::new(SECRET).with_timestamp_policy(TimestampPolicy::UnixSecondsStrict);
        let v = Verifier::new(options, Arc::new(InMemoryNonceStore::new())).unwrap();
        let ts = now().to_rfc3339();
        let result = v.verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert_eq!(result.reason, Some(FailureReason::InvalidTimestamp));
    }

    struct FailingStore;

    #[async_trait]
    impl NonceStore for FailingStore {
        async fn try_claim(
            &self,
            _nonce: &str,
            _expires_at: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> Result<bool, NonceStoreError> {
            Err(NonceStoreError::Unavailable("connection refused".to_string()))
        }
    }

    struct HangingStore;

    #[async_trait]
    impl NonceStore for HangingStore {
        async fn try_claim(
            &self,
            _nonce: &str,
            _expires_at: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> Result<bool, NonceStoreError> {
            std::future::pending::<()>().await;
            Ok(true)
        }
    }

    #[tokio::test]
    async fn store_error_is_unavailable_not_replay() {
        let v = Verifier::new(VerifierOptions::new(SECRET), Arc::new(FailingStore)).unwrap();
        let ts = now().timestamp().to_string();
        let result = v.verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert_eq!(result.reason, Some(FailureReason::StoreUnavailable));
        assert!(result.reason.unwrap().is_retriable());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_store_times_out_closed() {
        let options = VerifierOptions::new(SECRET).with_store_timeout(Duration::from_millis(250));
        let v = Verifier::new(options, Arc::new(HangingStore)).unwrap();
        let ts = now().timestamp().to_string();
        let result = v.verify(BODY, &signed(&ts, NONCE, BODY), now()).await;
        assert_eq!(result.reason, Some(FailureReason::StoreUnavailable));
    }

    #[test]
    fn blank_secret_fails_fast() {
        for secret in ["", "   "] {
            let err = Verifier::new(
                VerifierOptions::new(secret),
                Arc::new(InMemoryNonceStore::new()),
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::MissingSecret));
        }
    }

    #[test]
    fn zero_durations_fail_fast() {
        let store: Arc<dyn NonceStore> = Arc::new(InMemoryNonceStore::new());
        let zero_skew = VerifierOptions::new(SECRET).with_allowed_clock_skew(Duration::ZERO);
        assert!(Verifier::new(zero_skew, store.clone()).is_err());
        let zero_age = VerifierOptions::new(SECRET).with_max_message_age(Duration::ZERO);
        assert!(Verifier::new(zero_age, store.clone()).is_err());
        let zero_timeout = VerifierOptions::new(SECRET).with_store_timeout(Duration::ZERO);
        assert!(Verifier::new(zero_timeout, store).is_err());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", VerifierOptions::new("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn reasons_serialize_as_stable_strings() {
        let json = serde_json::to_string(&VerifyResult::fail(FailureReason::MessageTooOld)).unwrap();
        assert_eq!(json, r#"{"success":false,"reason":"message-too-old"}"#);
        let json = serde_json::to_string(&VerifyResult::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
        assert_eq!(FailureReason::SignatureMismatch.to_string(), "signature-mismatch");
        assert!(!FailureReason::Replay.is_retriable());
    }
}

//! Webhook signature validation implementation.
//!
//! Provides HMAC-SHA256 signature validation for Linear webhooks using
//! constant-time comparison, plus a freshness check on the delivery
//! timestamp to limit replay.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::auth::WebhookSecret;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "linear-signature";

/// Body field carrying the delivery time in milliseconds since the epoch.
pub const TIMESTAMP_FIELD: &str = "webhookTimestamp";

/// Maximum allowed distance between the delivery timestamp and now.
pub const DEFAULT_TIMESTAMP_TOLERANCE: Duration = Duration::from_secs(60);

/// Why a delivery failed verification. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    EmptySecret,
    MalformedSignature,
    HmacUnavailable,
    SignatureMismatch,
    StaleTimestamp,
}

/// Validates Linear webhook signatures using HMAC-SHA256.
///
/// # Security
///
/// - Uses constant-time comparison to prevent timing attacks
/// - Never logs secrets or signature values
/// - Verifies the exact bytes received; nothing is re-serialized
/// - Never panics or returns an error: every failure is `false`
///
/// # Examples
///
/// ```rust
/// use linear_agent_sdk::auth::WebhookSecret;
/// use linear_agent_sdk::webhook::SignatureVerifier;
///
/// let verifier = SignatureVerifier::new(WebhookSecret::new("lin_wh_secret"));
///
/// let payload = br#"{"type":"AppUserNotification"}"#;
/// let signature = verifier.sign(payload);
/// let now_ms = chrono::Utc::now().timestamp_millis();
///
/// assert!(verifier.verify(payload, &signature, now_ms));
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: WebhookSecret,
    tolerance: Duration,
}

impl SignatureVerifier {
    /// Create a verifier with the default 60 second freshness window.
    pub fn new(secret: WebhookSecret) -> Self {
        Self {
            secret,
            tolerance: DEFAULT_TIMESTAMP_TOLERANCE,
        }
    }

    /// Override the freshness window.
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Verify a delivery against the current time.
    ///
    /// # Arguments
    ///
    /// * `payload` - The raw webhook body, exactly as received
    /// * `signature` - Value of the `linear-signature` header (hex)
    /// * `timestamp_ms` - The body's `webhookTimestamp` field
    pub fn verify(&self, payload: &[u8], signature: &str, timestamp_ms: i64) -> bool {
        self.verify_at(payload, signature, timestamp_ms, Utc::now())
    }

    /// Verify a delivery against an explicit clock reading.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature: &str,
        timestamp_ms: i64,
        now: DateTime<Utc>,
    ) -> bool {
        match self.check(payload, signature, timestamp_ms, now) {
            Ok(()) => true,
            Err(reason) => {
                debug!(
                    reason = ?reason,
                    timestamp_ms = timestamp_ms,
                    "Webhook signature verification failed"
                );
                false
            }
        }
    }

    /// Compute the hex signature Linear would send for `payload`.
    ///
    /// Returns an empty string if the secret cannot key an HMAC, which never
    /// verifies.
    pub fn sign(&self, payload: &[u8]) -> String {
        self.compute_hmac(payload)
            .map(hex::encode)
            .unwrap_or_default()
    }

    fn check(
        &self,
        payload: &[u8],
        signature: &str,
        timestamp_ms: i64,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        if self.secret.is_empty() {
            return Err(Rejection::EmptySecret);
        }

        let provided = hex::decode(signature.trim())
            .map_err(|_| Rejection::MalformedSignature)?;
        let expected = self.compute_hmac(payload).ok_or(Rejection::HmacUnavailable)?;

        if !constant_time_compare(&provided, &expected) {
            return Err(Rejection::SignatureMismatch);
        }

        if !self.is_fresh(timestamp_ms, now) {
            return Err(Rejection::StaleTimestamp);
        }

        Ok(())
    }

    fn compute_hmac(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(payload);
        Some(mac.finalize().into_bytes().to_vec())
    }

    fn is_fresh(&self, timestamp_ms: i64, now: DateTime<Utc>) -> bool {
        let tolerance_ms = i64::try_from(self.tolerance.as_millis()).unwrap_or(i64::MAX);
        let drift = now.timestamp_millis().saturating_sub(timestamp_ms);
        drift.checked_abs().is_some_and(|d| d <= tolerance_ms)
    }
}

/// Constant-time comparison of signatures.
///
/// Length is checked first; that leaks nothing since the expected length is
/// fixed by the hash function.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

// Security: Don't expose secrets in debug output
impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;

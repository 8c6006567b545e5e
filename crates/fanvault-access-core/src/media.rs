//! Time-limited signed media references
//!
//! A granted content view carries a URL of the form
//! `{base}/{media_key}?expires={unix}&sig={base64url(HMAC-SHA256)}`.
//! The signature covers the media key and the expiry, so the media edge can
//! check a request with [`MediaSigner::verify`] and the shared secret alone.

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};

use crate::crypto::{HmacKey, HmacKeyError};

/// Signs and verifies media references
#[derive(Debug, Clone)]
pub struct MediaSigner {
    key: HmacKey,
    base_url: String,
    ttl: Duration,
}

impl MediaSigner {
    /// Create a signer for `base_url`
    pub fn new(
        base_url: impl Into<String>,
        secret: impl AsRef<[u8]>,
        ttl: Duration,
    ) -> Result<Self, HmacKeyError> {
        let base_url: String = base_url.into();
        Ok(Self {
            key: HmacKey::new(secret)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            ttl,
        })
    }

    /// Build a signed URL for `media_key` valid until `now + ttl`
    pub fn sign(&self, media_key: &str, now: DateTime<Utc>) -> String {
        let media_key = media_key.trim_start_matches('/');
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = now.timestamp().saturating_add(ttl);
        let sig = URL_SAFE_NO_PAD.encode(self.key.sign(&signing_input(media_key, expires)));

        format!("{}/{media_key}?expires={expires}&sig={sig}", self.base_url)
    }

    /// Check a presented reference.
    ///
    /// Fails for an expired reference, a malformed signature, or a signature
    /// made for another key or expiry.
    pub fn verify(&self, media_key: &str, expires: i64, sig: &str, now: DateTime<Utc>) -> bool {
        if expires <= now.timestamp() {
            return false;
        }
        let Ok(signature) = URL_SAFE_NO_PAD.decode(sig) else {
            return false;
        };
        let media_key = media_key.trim_start_matches('/');
        self.key.verify(&signing_input(media_key, expires), &signature)
    }
}

fn signing_input(media_key: &str, expires: i64) -> Vec<u8> {
    format!("{media_key}\n{expires}").into_bytes()
}

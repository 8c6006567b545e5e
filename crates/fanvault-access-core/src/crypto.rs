//! HMAC primitives for signed media references

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Keyed HMAC-SHA256 state, validated once and cloned per signature
#[derive(Clone)]
pub struct HmacKey {
    mac: Hmac<Sha256>,
    key_len: usize,
}

impl HmacKey {
    /// Minimum allowed key length in bytes (256 bits)
    pub const MIN_KEY_LENGTH: usize = 32;

    /// Create a new HMAC key from bytes.
    ///
    /// # Errors
    /// Returns error if key is too short (less than 32 bytes).
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, HmacKeyError> {
        let key_bytes = key.as_ref();
        if key_bytes.len() < Self::MIN_KEY_LENGTH {
            return Err(HmacKeyError::KeyTooShort {
                actual: key_bytes.len(),
                minimum: Self::MIN_KEY_LENGTH,
            });
        }
        let mac = Hmac::<Sha256>::new_from_slice(key_bytes)
            .map_err(|_| HmacKeyError::Rejected)?;
        Ok(Self {
            mac,
            key_len: key_bytes.len(),
        })
    }

    /// Sign data and return the MAC bytes
    pub fn sign(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    /// Verify a signature in constant time
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let expected = self.sign(data);
        expected[..].ct_eq(signature).into()
    }
}

impl std::fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacKey")
            .field("key_length", &self.key_len)
            .finish_non_exhaustive()
    }
}

/// Errors that can occur when creating an HMAC key
#[derive(Debug, Clone, thiserror::Error)]
pub enum HmacKeyError {
    #[error("HMAC key too short: got {actual} bytes, need at least {minimum}")]
    KeyTooShort { actual: usize, minimum: usize },

    #[error("HMAC key rejected")]
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_key_too_short() {
        let result = HmacKey::new("short");
        assert!(matches!(result, Err(HmacKeyError::KeyTooShort { .. })));
    }

    #[test]
    fn test_hmac_key_valid() {
        assert!(HmacKey::new("k".repeat(32)).is_ok());
    }

    #[test]
    fn test_hmac_sign_verify() {
        let key = HmacKey::new("k".repeat(48)).unwrap();
        let data = b"media/clip.mp4\n1700000000";
        let signature = key.sign(data);
        assert!(key.verify(data, &signature));
        assert!(!key.verify(b"media/other.mp4\n1700000000", &signature));
        assert!(!key.verify(data, &signature[..16]));
    }

    #[test]
    fn test_debug_hides_key() {
        let key = HmacKey::new("secret-material-".repeat(4)).unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("secret-material"));
        assert!(debug.contains("64"));
    }
}

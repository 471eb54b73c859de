//! HMAC signing of exposure key sets.
//!
//! ## Security Model
//!
//! The digest is computed as `HMAC-SHA256(secret, canonical_key_set(keys))`.
//! The secret is uploaded next to the keys; the server recomputes the digest
//! and compares it with the one bound to the submission certificate. Any
//! change to the key set between signing and upload breaks the match.
//!
//! Both digest and secret travel base64 (standard alphabet, padded).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;

use crate::canonical::canonical_key_set;
use crate::types::ExposureKey;

/// Length of generated HMAC secrets in bytes.
pub const HMAC_SECRET_LEN: usize = 16;

/// Error computing a key-set HMAC.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HmacError {
    /// The secret could not be used as an HMAC key.
    #[error("Invalid HMAC key length: {0} bytes")]
    InvalidKeyLength(usize),
}

/// Symmetric key used to sign one pipeline's uploads.
#[derive(Clone, PartialEq, Eq)]
pub struct HmacSecret(Vec<u8>);

impl HmacSecret {
    /// Generate a fresh secret from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; HMAC_SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Use explicit secret bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64 form sent to the key server.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl fmt::Debug for HmacSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HmacSecret(<redacted {} bytes>)", self.0.len())
    }
}

/// Digest and key produced by signing a key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmacOutput {
    /// Base64 HMAC-SHA256 digest of the canonical key set.
    pub digest: String,
    /// Base64 secret the digest was computed with.
    pub key: String,
}

/// Compute the HMAC digest and key for a key set.
///
/// Deterministic for a given secret: the same keys, in any order, yield the
/// same output.
pub fn calculate_hmac(secret: &HmacSecret, keys: &[ExposureKey]) -> Result<HmacOutput, HmacError> {
    let cleartext = canonical_key_set(keys);

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| HmacError::InvalidKeyLength(secret.as_bytes().len()))?;
    mac.update(cleartext.as_bytes());

    Ok(HmacOutput {
        digest: STANDARD.encode(mac.finalize().into_bytes()),
        key: secret.to_base64(),
    })
}

/// Check a base64 digest against a key set.
///
/// Constant-time comparison via `Mac::verify_slice`.
pub fn verify_hmac(secret: &HmacSecret, keys: &[ExposureKey], digest: &str) -> bool {
    let Ok(expected) = STANDARD.decode(digest) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(canonical_key_set(keys).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Signs key sets for upload.
///
/// The pipeline signs through this trait so hosts and tests can observe or
/// replace signing.
pub trait KeySetSigner: Send + Sync {
    /// Sign a key set.
    fn sign(&self, keys: &[ExposureKey]) -> Result<HmacOutput, HmacError>;
}

/// HMAC-SHA256 signer holding one secret for its lifetime.
#[derive(Debug, Clone)]
pub struct HmacSigner {
    secret: HmacSecret,
}

impl HmacSigner {
    /// Signer with a freshly generated secret.
    pub fn generate() -> Self {
        Self::new(HmacSecret::generate())
    }

    /// Signer with an explicit secret.
    pub fn new(secret: HmacSecret) -> Self {
        Self { secret }
    }

    /// The signing secret.
    pub fn secret(&self) -> &HmacSecret {
        &self.secret
    }
}

impl KeySetSigner for HmacSigner {
    fn sign(&self, keys: &[ExposureKey]) -> Result<HmacOutput, HmacError> {
        calculate_hmac(&self.secret, keys)
    }
}

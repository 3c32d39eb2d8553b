//! Process-wide HMAC secret shared by the token issuer and validator.
//!
//! The key is built once at start-up (see `config.rs`) and wrapped in an `Arc`;
//! nothing mutates it afterwards, so concurrent readers need no locking.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, EncodingKey};
use sha2::{Sha256, Sha384, Sha512};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningKeyError {
    #[error("signing key is not valid base64")]
    Encoding,
    #[error("signing key must be at least {required} bytes for {algorithm:?}, got {actual}")]
    TooShort {
        algorithm: Algorithm,
        required: usize,
        actual: usize,
    },
    #[error("{0:?} is not an HMAC algorithm")]
    NotHmac(Algorithm),
    #[error("failed to gather random bytes")]
    Entropy,
    #[error("hmac rejected the key")]
    MacKey,
}

/// Result of an HMAC check over `header.payload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacCheck {
    Match,
    Mismatch,
}

/// Symmetric secret bytes plus the `jsonwebtoken` encoding key derived from them.
///
/// Key material is never printed via Debug.
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.secret.len())
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Wrap raw secret bytes, enforcing the minimum length for `algorithm`.
    pub fn from_bytes(secret: Vec<u8>, algorithm: Algorithm) -> Result<Self, SigningKeyError> {
        let required = min_key_len(algorithm)?;
        if secret.len() < required {
            return Err(SigningKeyError::TooShort {
                algorithm,
                required,
                actual: secret.len(),
            });
        }

        let encoding_key = EncodingKey::from_secret(&secret);
        Ok(Self {
            secret,
            encoding_key,
        })
    }

    /// Decode a base64 (standard alphabet) secret, as supplied via `JWT_SIGNING_KEY`.
    pub fn from_base64(encoded: &str, algorithm: Algorithm) -> Result<Self, SigningKeyError> {
        let secret = STANDARD
            .decode(encoded.trim())
            .map_err(|_| SigningKeyError::Encoding)?;
        Self::from_bytes(secret, algorithm)
    }

    /// Fresh random key of the algorithm's minimum length.
    ///
    /// Tokens signed with an ephemeral key stop validating when the process restarts.
    pub fn generate(algorithm: Algorithm) -> Result<Self, SigningKeyError> {
        let mut secret = vec![0u8; min_key_len(algorithm)?];
        OsRng
            .try_fill_bytes(&mut secret)
            .map_err(|_| SigningKeyError::Entropy)?;
        Self::from_bytes(secret, algorithm)
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Recompute the MAC over `message` and compare it with `signature` in constant time.
    pub fn check_mac(
        &self,
        algorithm: Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<MacCheck, SigningKeyError> {
        match algorithm {
            Algorithm::HS256 => check::<Hmac<Sha256>>(&self.secret, message, signature),
            Algorithm::HS384 => check::<Hmac<Sha384>>(&self.secret, message, signature),
            Algorithm::HS512 => check::<Hmac<Sha512>>(&self.secret, message, signature),
            other => Err(SigningKeyError::NotHmac(other)),
        }
    }
}

fn check<M>(secret: &[u8], message: &[u8], signature: &[u8]) -> Result<MacCheck, SigningKeyError>
where
    M: Mac + KeyInit,
{
    // HMAC accepts keys of any length; this only fails on a broken digest impl.
    let mut mac = <M as KeyInit>::new_from_slice(secret).map_err(|_| SigningKeyError::MacKey)?;
    Mac::update(&mut mac, message);

    Ok(match mac.verify_slice(signature) {
        Ok(()) => MacCheck::Match,
        Err(_) => MacCheck::Mismatch,
    })
}

/// Digest output size; RFC 7518 requires HMAC keys at least this long.
pub fn min_key_len(algorithm: Algorithm) -> Result<usize, SigningKeyError> {
    match algorithm {
        Algorithm::HS256 => Ok(32),
        Algorithm::HS384 => Ok(48),
        Algorithm::HS512 => Ok(64),
        other => Err(SigningKeyError::NotHmac(other)),
    }
}

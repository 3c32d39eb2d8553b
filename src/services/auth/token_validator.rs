//! Bearer token verification.
//!
//! Checks run in a fixed order and the first failure decides the outcome:
//! 1. three-segment structure (`Malformed`)
//! 2. header algorithm (`Unsupported`)
//! 3. HMAC over `header.payload` (`SignatureMismatch`)
//! 4. claims shape (`Empty`)
//! 5. expiry (`Expired`)
//!
//! A tampered token that is also expired therefore reports `SignatureMismatch`.
//! Nothing here panics or returns an error past `validate`: every fault becomes an
//! [`AuthOutcome`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use thiserror::Error;

use crate::services::auth::claims::TokenClaims;
use crate::services::auth::signing_key::{MacCheck, SigningKey};

/// Result of validating one token. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Valid(String),
    Expired,
    SignatureMismatch,
    Malformed,
    Unsupported,
    Empty,
    Unknown,
}

impl AuthOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Expired => "expired",
            Self::SignatureMismatch => "signature_mismatch",
            Self::Malformed => "malformed",
            Self::Unsupported => "unsupported",
            Self::Empty => "empty",
            Self::Unknown => "unknown",
        }
    }
}

/// Failure reasons inside the pipeline; converted to `AuthOutcome` at the boundary.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not a three-segment compact JWS")]
    Malformed,
    #[error("token algorithm is not accepted")]
    Unsupported,
    #[error("token signature does not match")]
    SignatureMismatch,
    #[error("token claims are empty or unreadable")]
    Empty,
    #[error("token expired")]
    Expired,
    #[error("unexpected token validation failure")]
    Unknown,
}

impl From<TokenError> for AuthOutcome {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Malformed => Self::Malformed,
            TokenError::Unsupported => Self::Unsupported,
            TokenError::SignatureMismatch => Self::SignatureMismatch,
            TokenError::Empty => Self::Empty,
            TokenError::Expired => Self::Expired,
            TokenError::Unknown => Self::Unknown,
        }
    }
}

// Only `alg` matters here; everything else in the header is ignored.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

#[derive(Clone)]
pub struct TokenValidator {
    key: Arc<SigningKey>,
    algorithm: Algorithm,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    pub fn new(key: Arc<SigningKey>, algorithm: Algorithm) -> Self {
        Self { key, algorithm }
    }

    pub fn validate(&self, token: &str) -> AuthOutcome {
        self.validate_at(token, Utc::now())
    }

    /// Validate against an explicit clock. A token is expired once `exp <= now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> AuthOutcome {
        contain(|| self.verify(token, now.timestamp()))
    }

    /// Full pipeline returning the decoded claims.
    pub fn verify(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let (signing_input, header, payload, signature) = split(token)?;

        self.check_algorithm(&header)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::SignatureMismatch)?;
        match self
            .key
            .check_mac(self.algorithm, signing_input.as_bytes(), &signature)
        {
            Ok(MacCheck::Match) => {}
            Ok(MacCheck::Mismatch) => return Err(TokenError::SignatureMismatch),
            Err(_) => return Err(TokenError::Unknown),
        }

        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Empty)?;
        if claims.sub.trim().is_empty() {
            return Err(TokenError::Empty);
        }

        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn check_algorithm(&self, header: &[u8]) -> Result<(), TokenError> {
        let header: RawHeader =
            serde_json::from_slice(header).map_err(|_| TokenError::Malformed)?;

        let alg = Algorithm::from_str(&header.alg).map_err(|_| TokenError::Unsupported)?;
        if alg != self.algorithm {
            return Err(TokenError::Unsupported);
        }
        Ok(())
    }
}

/// Run one verification, turning a panic into `Unknown`.
fn contain<F>(verify: F) -> AuthOutcome
where
    F: FnOnce() -> Result<TokenClaims, TokenError>,
{
    match catch_unwind(AssertUnwindSafe(verify)) {
        Ok(Ok(claims)) => AuthOutcome::Valid(claims.sub),
        Ok(Err(e)) => e.into(),
        Err(_) => {
            tracing::error!("token validation panicked");
            AuthOutcome::Unknown
        }
    }
}

/// Split `header.payload.signature`, decoding header and payload.
///
/// The signature segment is returned undecoded: bytes that cannot be decoded
/// cannot match either, so that case belongs to the signature check.
fn split(token: &str) -> Result<(&str, Vec<u8>, Vec<u8>, &str), TokenError> {
    let token = token.trim();
    let mut segments = token.split('.');

    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed);
    };

    if header.is_empty() || payload.is_empty() {
        return Err(TokenError::Malformed);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;

    let signing_input = &token[..header.len() + 1 + payload.len()];
    Ok((signing_input, header_bytes, payload_bytes, signature))
}

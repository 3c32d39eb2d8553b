use std::num::NonZeroU64;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, Header};
use thiserror::Error;
use uuid::Uuid;

use crate::services::auth::claims::TokenClaims;
use crate::services::auth::signing_key::SigningKey;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("subject must not be blank")]
    EmptySubject,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// A freshly signed token and the timestamps baked into it.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the bearer credential
        f.debug_struct("IssuedToken")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Signs `{sub, iat, exp, jti}` with the shared HMAC key.
#[derive(Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    algorithm: Algorithm,
    ttl_seconds: NonZeroU64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenIssuer {
    /// A non-zero TTL keeps `exp` strictly after `iat`.
    pub fn new(key: Arc<SigningKey>, algorithm: Algorithm, ttl_seconds: NonZeroU64) -> Self {
        Self {
            key,
            algorithm,
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds.get()
    }

    /// Issue a token for an already-authenticated subject.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, IssueError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedToken, IssueError> {
        if subject.trim().is_empty() {
            return Err(IssueError::EmptySubject);
        }

        let issued_at = now.timestamp();
        let expires_at = issued_at.saturating_add_unsigned(self.ttl_seconds.get());

        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: issued_at,
            exp: expires_at,
            jti: Some(Uuid::new_v4().to_string()),
        };

        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());
        let token = jsonwebtoken::encode(&header, &claims, self.key.encoding_key())?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::TimeZone;

    use super::*;

    fn issuer(ttl_seconds: u64) -> TokenIssuer {
        let key = SigningKey::from_bytes(vec![9u8; 64], Algorithm::HS512).unwrap();
        TokenIssuer::new(
            Arc::new(key),
            Algorithm::HS512,
            NonZeroU64::new(ttl_seconds).unwrap(),
        )
    }

    fn segment_json(token: &str, index: usize) -> serde_json::Value {
        let segment = token.split('.').nth(index).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn expiry_is_issue_time_plus_ttl() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let issued = issuer(600).issue_at("alice", now).unwrap();

        assert_eq!(issued.issued_at, now.timestamp());
        assert_eq!(issued.expires_at, now.timestamp() + 600);

        let payload = segment_json(&issued.token, 1);
        assert_eq!(payload["sub"], "alice");
        assert_eq!(payload["iat"], now.timestamp());
        assert_eq!(payload["exp"], now.timestamp() + 600);
        assert!(payload["jti"].is_string());
    }

    #[test]
    fn shortest_ttl_still_expires_after_issue() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let issued = issuer(1).issue_at("alice", now).unwrap();
        assert!(issued.expires_at > issued.issued_at);
        assert!(NonZeroU64::new(0).is_none());
    }

    #[test]
    fn header_declares_hmac_algorithm() {
        let issued = issuer(60).issue("alice").unwrap();
        let header = segment_json(&issued.token, 0);
        assert_eq!(header["alg"], "HS512");
        assert_eq!(header["typ"], "JWT");
        assert_eq!(issued.token.split('.').count(), 3);
    }

    #[test]
    fn same_subject_same_second_still_differs() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let issuer = issuer(60);
        let a = issuer.issue_at("alice", now).unwrap();
        let b = issuer.issue_at("alice", now).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn blank_subject_is_refused() {
        assert!(matches!(
            issuer(60).issue("  "),
            Err(IssueError::EmptySubject)
        ));
    }

    #[test]
    fn debug_omits_token() {
        let issued = issuer(60).issue("alice").unwrap();
        assert!(!format!("{issued:?}").contains(&issued.token));
    }
}

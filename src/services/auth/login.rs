use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::services::auth::directory::{CredentialVerifier, DirectoryError, IdentityLookup};
use crate::services::auth::token_issuer::{IssuedToken, TokenIssuer};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("user not found")]
    UserNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("login failed: {0}")]
    Internal(String),
}

/// Username/password login, ending in a freshly issued token.
///
/// The existence check runs before any credential comparison, so an unknown
/// username gets its own `UserNotFound` answer. This does reveal which names exist.
#[derive(Clone)]
pub struct LoginService {
    lookup: Arc<dyn IdentityLookup>,
    verifier: Arc<dyn CredentialVerifier>,
    issuer: Arc<TokenIssuer>,
}

impl std::fmt::Debug for LoginService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginService")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl LoginService {
    pub fn new(
        lookup: Arc<dyn IdentityLookup>,
        verifier: Arc<dyn CredentialVerifier>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            lookup,
            verifier,
            issuer,
        }
    }

    pub fn token_ttl_seconds(&self) -> u64 {
        self.issuer.ttl_seconds()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, LoginError> {
        let exists = self.lookup.exists(username).await.map_err(|e| {
            error!(error = %e, "user existence check failed");
            LoginError::Internal(e.to_string())
        })?;
        if !exists {
            debug!(username, "login for unknown user");
            return Err(LoginError::UserNotFound);
        }

        self.verifier
            .verify(username, password)
            .await
            .map_err(|e| match e {
                DirectoryError::InvalidCredentials => {
                    debug!(username, "credential mismatch");
                    LoginError::InvalidCredentials
                }
                // Removed between the existence check and verification.
                DirectoryError::NotFound => LoginError::UserNotFound,
                other => {
                    error!(error = %other, "credential verification failed");
                    LoginError::Internal(other.to_string())
                }
            })?;

        let issued = self.issuer.issue(username).map_err(|e| {
            error!(error = %e, "token issuance failed");
            LoginError::Internal(e.to_string())
        })?;

        info!(username, expires_at = issued.expires_at, "token issued");
        Ok(issued)
    }
}

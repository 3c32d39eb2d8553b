//! Interfaces to the user directory.
//!
//! The token lifecycle only needs three things from wherever users live:
//! an existence check plus authority lookup, a credential check, and user creation.
//! `repos::user_repo::UserRepo` is the bundled in-memory implementation.
use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

/// Closed set of collaborator failures.
///
/// Callers map these to their own error types; nothing here knows about HTTP.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("user not found")]
    NotFound,
    #[error("username already exists")]
    AlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("directory backend failure: {0}")]
    Backend(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Resolves a subject name into what the rest of the request may do.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn exists(&self, username: &str) -> DirectoryResult<bool>;

    /// Authorities (roles) granted to `username`. `NotFound` when the user is gone.
    async fn authorities(&self, username: &str) -> DirectoryResult<BTreeSet<String>>;
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(())` when the password matches; `InvalidCredentials` when it does not.
    async fn verify(&self, username: &str, password: &str) -> DirectoryResult<()>;
}

/// Input for [`UserRegistrar::create`]. The password is still plain text here;
/// the registrar owns hashing.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub roles: BTreeSet<String>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait UserRegistrar: Send + Sync {
    /// Create the user, or fail with `AlreadyExists` if the name is taken.
    async fn create(&self, user: NewUser) -> DirectoryResult<()>;
}

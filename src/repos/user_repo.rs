/*
 * Responsibility
 * - users の保存先 (in-memory; 永続化はこの service の範囲外)
 * - IdentityLookup / CredentialVerifier / UserRegistrar の実装
 * - password hash (argon2) は blocking pool で計算する
 */
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::error;

use crate::services::auth::directory::{
    CredentialVerifier, DirectoryError, DirectoryResult, IdentityLookup, NewUser, UserRegistrar,
};
use crate::services::auth::password::{PasswordError, PasswordHashing};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub username: String,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UserRepo {
    users: Arc<RwLock<HashMap<String, UserRow>>>,
    hashing: PasswordHashing,
}

impl UserRepo {
    pub fn new(hashing: PasswordHashing) -> Self {
        Self {
            users: Arc::default(),
            hashing,
        }
    }

    pub async fn get(&self, username: &str) -> Option<UserRow> {
        self.users.read().await.get(username).cloned()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }

    async fn hash_password(&self, password: String) -> DirectoryResult<String> {
        let hashing = self.hashing.clone();
        tokio::task::spawn_blocking(move || hashing.hash(&password))
            .await
            .map_err(|e| DirectoryError::Backend(e.to_string()))?
            .map_err(|e| {
                error!(error = %e, "password hashing failed");
                DirectoryError::Backend(e.to_string())
            })
    }
}

#[async_trait]
impl IdentityLookup for UserRepo {
    async fn exists(&self, username: &str) -> DirectoryResult<bool> {
        Ok(self.users.read().await.contains_key(username))
    }

    async fn authorities(&self, username: &str) -> DirectoryResult<BTreeSet<String>> {
        self.users
            .read()
            .await
            .get(username)
            .map(|u| u.roles.clone())
            .ok_or(DirectoryError::NotFound)
    }
}

#[async_trait]
impl CredentialVerifier for UserRepo {
    async fn verify(&self, username: &str, password: &str) -> DirectoryResult<()> {
        let stored = self
            .get(username)
            .await
            .ok_or(DirectoryError::NotFound)?
            .password_hash;

        let hashing = self.hashing.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || hashing.verify(&password, &stored))
            .await
            .map_err(|e| DirectoryError::Backend(e.to_string()))?;

        match verified {
            Ok(()) => Ok(()),
            Err(PasswordError::Mismatch) => Err(DirectoryError::InvalidCredentials),
            Err(e) => {
                error!(username, error = %e, "stored password hash unusable");
                Err(DirectoryError::Backend(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl UserRegistrar for UserRepo {
    async fn create(&self, user: NewUser) -> DirectoryResult<()> {
        // Skip the expensive hash when the name is obviously taken.
        if self.users.read().await.contains_key(&user.username) {
            return Err(DirectoryError::AlreadyExists);
        }

        let password_hash = self.hash_password(user.password).await?;

        // Re-check under the write lock: two racing registrations may both pass the read above.
        match self.users.write().await.entry(user.username) {
            Entry::Occupied(_) => Err(DirectoryError::AlreadyExists),
            Entry::Vacant(slot) => {
                let username = slot.key().clone();
                slot.insert(UserRow {
                    username,
                    password_hash,
                    roles: user.roles,
                });
                Ok(())
            }
        }
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::services::auth::directory::{DirectoryError, NewUser, UserRegistrar};
use crate::services::auth::role_policy::RolePolicy;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("username already exists")]
    UsernameTaken,
    #[error("registration failed: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub username: String,
    pub roles: BTreeSet<String>,
}

#[derive(Clone)]
pub struct RegistrationService {
    registrar: Arc<dyn UserRegistrar>,
    policy: RolePolicy,
}

impl std::fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RegistrationService {
    pub fn new(registrar: Arc<dyn UserRegistrar>, policy: RolePolicy) -> Self {
        Self { registrar, policy }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<RegisteredUser, RegistrationError> {
        let roles = self.policy.roles_for(username);

        let user = NewUser {
            username: username.to_string(),
            password: password.to_string(),
            roles: roles.clone(),
        };

        self.registrar.create(user).await.map_err(|e| match e {
            DirectoryError::AlreadyExists => RegistrationError::UsernameTaken,
            other => {
                error!(error = %other, "user creation failed");
                RegistrationError::Internal(other.to_string())
            }
        })?;

        info!(username, roles = ?roles, "user registered");
        Ok(RegisteredUser {
            username: username.to_string(),
            roles,
        })
    }
}

use std::collections::BTreeSet;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Always "Bearer"
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub username: String,
    pub roles: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentityResponse {
    pub subject: String,
    pub authorities: BTreeSet<String>,
}

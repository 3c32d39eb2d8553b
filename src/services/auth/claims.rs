use serde::{Deserialize, Serialize};

/// Claims carried by every bearer token this service issues.
///
/// - `iat` / `exp` are epoch seconds (JWT NumericDate).
/// - `jti` keeps two tokens for the same subject distinct even inside one second.
///   Tokens without it still validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

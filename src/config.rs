/*
 * Responsibility
 * - 環境変数の読み込み (PORT, JWT_SIGNING_KEY, JWT_TTL_SECONDS など)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 * - signing key はここで一度だけ作る (以後は不変)
 */
use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::services::auth::signing_key::{SigningKey, SigningKeyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub jwt_algorithm: Algorithm,
    pub signing_key: SigningKey,
    // true when no JWT_SIGNING_KEY was given and a random one was generated
    pub signing_key_ephemeral: bool,
    pub token_ttl_seconds: NonZeroU64,

    pub elevated_usernames: Vec<String>,

    pub request_timeout: Duration,
    pub request_body_limit_bytes: usize,
    pub abort_on_panic: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in `from_env`).
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match var("PORT") {
            Some(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV").as_deref());

        let jwt_algorithm = match var("JWT_ALGORITHM").as_deref().map(str::trim) {
            None | Some("") => Algorithm::HS512,
            Some("HS256") => Algorithm::HS256,
            Some("HS384") => Algorithm::HS384,
            Some("HS512") => Algorithm::HS512,
            Some(_) => return Err(ConfigError::Invalid("JWT_ALGORITHM")),
        };

        let (signing_key, signing_key_ephemeral) =
            match var("JWT_SIGNING_KEY").filter(|s| !s.trim().is_empty()) {
                Some(encoded) => (
                    SigningKey::from_base64(&encoded, jwt_algorithm)
                        .map_err(|_| ConfigError::Invalid("JWT_SIGNING_KEY"))?,
                    false,
                ),
                None if app_env.is_production() => {
                    return Err(ConfigError::Missing("JWT_SIGNING_KEY"));
                }
                None => (
                    SigningKey::generate(jwt_algorithm).map_err(|e| match e {
                        SigningKeyError::Entropy => ConfigError::Invalid("JWT_SIGNING_KEY"),
                        _ => ConfigError::Invalid("JWT_ALGORITHM"),
                    })?,
                    true,
                ),
            };

        let token_ttl_seconds = positive(&var, "JWT_TTL_SECONDS", 600)?; // 10 min

        let elevated_usernames = var("ELEVATED_USERNAMES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let request_timeout =
            Duration::from_secs(positive(&var, "REQUEST_TIMEOUT_SECONDS", 30)?.get());

        let request_body_limit_bytes = usize::try_from(
            positive(&var, "REQUEST_BODY_LIMIT_BYTES", 64 * 1024)?.get(),
        )
        .map_err(|_| ConfigError::Invalid("REQUEST_BODY_LIMIT_BYTES"))?;

        let abort_on_panic = var("ABORT_ON_PANIC")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            addr,
            app_env,
            jwt_algorithm,
            signing_key,
            signing_key_ephemeral,
            token_ttl_seconds,
            elevated_usernames,
            request_timeout,
            request_body_limit_bytes,
            abort_on_panic,
        })
    }
}

/// Unset means `default`; anything else must parse as an integer > 0.
fn positive<F>(var: &F, key: &'static str, default: u64) -> Result<NonZeroU64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(s) => s
            .trim()
            .parse::<NonZeroU64>()
            .map_err(|_| ConfigError::Invalid(key)),
        None => NonZeroU64::new(default).ok_or(ConfigError::Invalid(key)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn development_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.jwt_algorithm, Algorithm::HS512);
        assert!(config.signing_key_ephemeral);
        assert_eq!(config.token_ttl_seconds.get(), 600);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.request_body_limit_bytes, 64 * 1024);
        assert!(config.elevated_usernames.is_empty());
        assert!(!config.abort_on_panic);
    }

    #[test]
    fn production_requires_a_key() {
        let err = load(&[("APP_ENV", "production")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SIGNING_KEY"));
    }

    #[test]
    fn explicit_key_is_used() {
        let key = STANDARD.encode([42u8; 64]);
        let config = load(&[("APP_ENV", "prod"), ("JWT_SIGNING_KEY", &key)]).unwrap();
        assert!(!config.signing_key_ephemeral);
        assert!(config.app_env.is_production());
    }

    #[test]
    fn key_too_short_for_algorithm() {
        let key = STANDARD.encode([42u8; 32]);
        assert_eq!(
            load(&[("JWT_SIGNING_KEY", &key)]).unwrap_err(),
            ConfigError::Invalid("JWT_SIGNING_KEY")
        );
        assert!(load(&[("JWT_SIGNING_KEY", &key), ("JWT_ALGORITHM", "HS256")]).is_ok());
    }

    #[test]
    fn rejects_non_hmac_algorithm() {
        assert_eq!(
            load(&[("JWT_ALGORITHM", "RS256")]).unwrap_err(),
            ConfigError::Invalid("JWT_ALGORITHM")
        );
    }

    #[test]
    fn ttl_must_be_positive() {
        for bad in ["0", "-5", "soon"] {
            assert_eq!(
                load(&[("JWT_TTL_SECONDS", bad)]).unwrap_err(),
                ConfigError::Invalid("JWT_TTL_SECONDS")
            );
        }
        assert_eq!(
            load(&[("JWT_TTL_SECONDS", "1")]).unwrap().token_ttl_seconds.get(),
            1
        );
    }

    #[test]
    fn http_limits_must_be_positive_integers() {
        for key in ["REQUEST_TIMEOUT_SECONDS", "REQUEST_BODY_LIMIT_BYTES"] {
            for bad in ["0", "-1", "lots", ""] {
                assert_eq!(
                    load(&[(key, bad)]).unwrap_err(),
                    ConfigError::Invalid(key),
                    "{key}={bad:?}"
                );
            }
        }

        let config = load(&[
            ("REQUEST_TIMEOUT_SECONDS", "5"),
            ("REQUEST_BODY_LIMIT_BYTES", " 1024 "),
        ])
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.request_body_limit_bytes, 1024);
    }

    #[test]
    fn elevated_usernames_are_split() {
        let config = load(&[("ELEVATED_USERNAMES", " ops_admin, ,root_ops ")]).unwrap();
        assert_eq!(config.elevated_usernames, vec!["ops_admin", "root_ops"]);
    }

    #[test]
    fn bad_port_is_invalid() {
        assert_eq!(
            load(&[("PORT", "http")]).unwrap_err(),
            ConfigError::Invalid("PORT")
        );
    }
}

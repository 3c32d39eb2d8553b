/*
 * Responsibility
 * - login / register 共通の request body
 * - 形式チェック (business logic より前に実行する)
 */
use serde::{Deserialize, Deserializer};

use crate::error::FieldErrors;

pub const USERNAME_REQUIRED: &str = "Username is required";
pub const USERNAME_PATTERN: &str = "Username can only contain letters, numbers and underscores";
pub const PASSWORD_REQUIRED: &str = "Password is required";
pub const PASSWORD_PATTERN: &str =
    "Password must contain at least one lowercase letter, one uppercase letter and one digit";

/// Body of `POST /api/auth/login` and `POST /api/auth/register`.
///
/// Missing or `null` fields deserialize as "" so they show up as "required"
/// field errors instead of a body rejection.
#[derive(Clone, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default, deserialize_with = "null_as_blank")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_blank")]
    pub password: String,
}

fn null_as_blank<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

pub type LoginRequest = CredentialsRequest;
pub type RegisterRequest = CredentialsRequest;

impl CredentialsRequest {
    /// First failing rule per field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Err(msg) = check_username(&self.username) {
            errors.insert("username", msg.to_string());
        }
        if let Err(msg) = check_password(&self.password) {
            errors.insert("password", msg.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ^[a-zA-Z0-9_]+$
fn check_username(username: &str) -> Result<(), &'static str> {
    if username.trim().is_empty() {
        return Err(USERNAME_REQUIRED);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(USERNAME_PATTERN);
    }
    Ok(())
}

// ^(?=.*[a-z])(?=.*[A-Z])(?=.*\d).*$ ; `.` stops at line terminators
fn check_password(password: &str) -> Result<(), &'static str> {
    if password.trim().is_empty() {
        return Err(PASSWORD_REQUIRED);
    }

    let single_line = !password
        .chars()
        .any(|c| matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}'));
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());

    if single_line && lower && upper && digit {
        Ok(())
    } else {
        Err(PASSWORD_PATTERN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(username: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed() {
        assert!(req("alice_01", "Secret123").validate().is_ok());
        assert!(req("A", "aB3").validate().is_ok());
    }

    #[test]
    fn blank_fields_are_required() {
        let errors = req("  ", "").validate().unwrap_err();
        assert_eq!(errors["username"], USERNAME_REQUIRED);
        assert_eq!(errors["password"], PASSWORD_REQUIRED);
    }

    #[test]
    fn username_charset() {
        for bad in ["alice smith", "alice-1", "élodie", "bob!"] {
            let errors = req(bad, "Secret123").validate().unwrap_err();
            assert_eq!(errors["username"], USERNAME_PATTERN, "{bad}");
            assert!(!errors.contains_key("password"));
        }
    }

    #[test]
    fn password_needs_each_class() {
        for bad in ["secret123", "SECRET123", "SecretPass", "Secret\n123"] {
            let errors = req("alice", bad).validate().unwrap_err();
            assert_eq!(errors["password"], PASSWORD_PATTERN, "{bad:?}");
        }
    }

    #[test]
    fn missing_fields_default_to_blank() {
        let parsed: CredentialsRequest = serde_json::from_str("{}").unwrap();
        let errors = parsed.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn null_fields_are_blank() {
        let parsed: CredentialsRequest =
            serde_json::from_str(r#"{"username":null,"password":null}"#).unwrap();
        let errors = parsed.validate().unwrap_err();
        assert_eq!(errors["username"], USERNAME_REQUIRED);
        assert_eq!(errors["password"], PASSWORD_REQUIRED);
    }

    #[test]
    fn debug_omits_password() {
        let printed = format!("{:?}", req("alice", "Secret123"));
        assert!(!printed.contains("Secret123"));
    }
}

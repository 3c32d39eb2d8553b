/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - service 層のエラー (LoginError / RegistrationError) を変換
 *
 * Notes
 * - 認証失敗 (INVALID_CREDENTIALS) と内部エラー (INTERNAL_ERROR) は別の status/code
 */
use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::login::LoginError;
use crate::services::auth::registration::RegistrationError;

/// field name -> message
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("user not found")]
    UserNotFound,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username already exists")]
    UsernameTaken,

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::UsernameTaken => "USERNAME_ALREADY_EXISTS",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UsernameTaken => StatusCode::BAD_REQUEST,
            AppError::UserNotFound | AppError::InvalidCredentials | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        let errors = match self {
            AppError::Validation(fields) => Some(fields),
            _ => None,
        };

        let body = ErrorResponse {
            status: "error",
            error: code,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LoginError> for AppError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::UserNotFound => AppError::UserNotFound,
            LoginError::InvalidCredentials => AppError::InvalidCredentials,
            // Details were logged where they happened.
            LoginError::Internal(_) => AppError::Internal,
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::UsernameTaken => AppError::UsernameTaken,
            RegistrationError::Internal(_) => AppError::Internal,
        }
    }
}

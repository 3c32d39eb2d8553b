use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

use super::IdentityContext;

/// Handler で IdentityContext を受け取るための extractor
/// 認証 filter が成功時に request.extensions() へ insert している前提
/// 見つからない場合は 401 (token なし / 無効 / filter 未設定)
#[derive(Debug, Clone)]
pub struct Identity(pub IdentityContext);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .map(Identity)
            .ok_or(AppError::Unauthorized)
    }
}

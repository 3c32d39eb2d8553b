use axum::{Json, extract::State};

use crate::api::auth::dto::{credentials::LoginRequest, responses::TokenResponse};
use crate::error::AppError;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    req.validate().map_err(AppError::Validation)?;

    let issued = state.login.login(&req.username, &req.password).await?;

    Ok(Json(TokenResponse {
        token: issued.token,
        token_type: "Bearer",
        expires_in: state.login.token_ttl_seconds(),
    }))
}

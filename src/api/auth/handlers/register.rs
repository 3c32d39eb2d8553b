use axum::{Json, extract::State};

use crate::api::auth::dto::{credentials::RegisterRequest, responses::RegisterResponse};
use crate::error::AppError;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    req.validate().map_err(AppError::Validation)?;

    let user = state
        .registration
        .register(&req.username, &req.password)
        .await?;

    Ok(Json(RegisterResponse {
        username: user.username,
        roles: user.roles,
    }))
}

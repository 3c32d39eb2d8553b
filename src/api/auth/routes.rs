/*
 * Responsibility
 * - /api/auth 配下の URL 構造
 * - 認証 filter は api::routes() 側で全体に掛ける
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::auth::handlers::{login::login, me::me, register::register};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
}

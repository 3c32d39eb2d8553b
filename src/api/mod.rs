/*
 * Responsibility
 * - /api 配下の Router 組み立て
 * - 認証 filter を /api 全体に掛ける (filter 自体は request を拒否しない)
 */
use axum::Router;

use crate::middleware;
use crate::state::AppState;

pub mod auth;
pub mod extractors;

pub fn routes(state: AppState) -> Router<AppState> {
    let api = Router::new().nest("/auth", auth::routes());
    middleware::auth::apply(api, state)
}

/*
 * Responsibility
 * - Config 読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (認証 filter は /api、HTTP 共通 layer は全体)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware::{self, auth::AuthenticationFilter};
use crate::repos::user_repo::UserRepo;
use crate::services::auth::role_policy::RolePolicy;
use crate::services::auth::{LoginService, RegistrationService, TokenIssuer, TokenValidator};
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG wins, e.g. RUST_LOG=info,bearer_auth=debug to see filter states
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(%info, "panic");

        // Off by default: the filter and validator recover from panics in-process.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(config.abort_on_panic);

    tracing::info!(
        env = ?config.app_env,
        addr = %config.addr,
        algorithm = ?config.jwt_algorithm,
        token_ttl_seconds = config.token_ttl_seconds.get(),
        "starting bearer-auth"
    );
    if config.signing_key_ephemeral {
        tracing::warn!(
            "JWT_SIGNING_KEY not set; using a random key, tokens will not survive a restart"
        );
    }

    let state = build_state(&config, UserRepo::default());
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire process-level services into the shared state.
///
/// `users` backs identity lookup, credential checks and registration alike.
pub fn build_state(config: &Config, users: UserRepo) -> AppState {
    let key = Arc::new(config.signing_key.clone());
    let issuer = Arc::new(TokenIssuer::new(
        key.clone(),
        config.jwt_algorithm,
        config.token_ttl_seconds,
    ));
    let validator = Arc::new(TokenValidator::new(key, config.jwt_algorithm));

    let users = Arc::new(users);
    let policy = RolePolicy::new(config.elevated_usernames.iter().cloned());

    let login = LoginService::new(users.clone(), users.clone(), issuer);
    let registration = RegistrationService::new(users.clone(), policy);
    let auth_filter = AuthenticationFilter::new(validator, users);

    AppState::new(
        Arc::new(login),
        Arc::new(registration),
        Arc::new(auth_filter),
    )
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    async fn health() -> &'static str {
        "ok"
    }

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api", api::routes(state.clone()))
        .with_state(state);

    middleware::http::apply(router, config)
}

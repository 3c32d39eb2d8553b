/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Clone 前提で持つ (内部は Arc)
 * - request ごとの identity はここに置かない (request extensions に載せる)
 */
use std::sync::Arc;

use crate::middleware::auth::AuthenticationFilter;
use crate::services::auth::{LoginService, RegistrationService};

#[derive(Clone, Debug)]
pub struct AppState {
    pub login: Arc<LoginService>,
    pub registration: Arc<RegistrationService>,
    pub auth_filter: Arc<AuthenticationFilter>,
}

impl AppState {
    pub fn new(
        login: Arc<LoginService>,
        registration: Arc<RegistrationService>,
        auth_filter: Arc<AuthenticationFilter>,
    ) -> Self {
        Self {
            login,
            registration,
            auth_filter,
        }
    }
}

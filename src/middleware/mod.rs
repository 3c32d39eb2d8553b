/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: bearer token → IdentityContext
 * - http: request id / trace / body limit / timeout
 */
pub mod auth;
pub mod http;

//! Bearer token → IdentityContext, once per request.
//!
//! The filter never rejects a request. It either attaches an `IdentityContext`
//! to the request extensions or makes sure none is there; handlers that need an
//! identity ask for it through the `Identity` extractor.
//!
//! Token text and header values are never logged.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};
use futures::FutureExt;
use tracing::{debug, warn};

use crate::api::extractors::IdentityContext;
use crate::services::auth::directory::IdentityLookup;
use crate::services::auth::{AuthOutcome, TokenValidator};
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Where a request ended up in the authentication state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    NoToken,
    TokenPresent,
    Authenticated,
    Rejected,
}

impl FilterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoToken => "no_token",
            Self::TokenPresent => "token_present",
            Self::Authenticated => "authenticated",
            Self::Rejected => "rejected",
        }
    }
}

/// Final state plus the identity to attach, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub state: FilterState,
    pub identity: Option<IdentityContext>,
}

impl Resolution {
    fn anonymous(state: FilterState) -> Self {
        Self {
            state,
            identity: None,
        }
    }
}

#[derive(Clone)]
pub struct AuthenticationFilter {
    validator: Arc<TokenValidator>,
    lookup: Arc<dyn IdentityLookup>,
}

impl std::fmt::Debug for AuthenticationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationFilter")
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl AuthenticationFilter {
    pub fn new(validator: Arc<TokenValidator>, lookup: Arc<dyn IdentityLookup>) -> Self {
        Self { validator, lookup }
    }

    /// Token after the case-sensitive `Bearer ` prefix, if there is a non-blank one.
    pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix(BEARER_PREFIX)?.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Run the state machine for one request's headers.
    ///
    /// The identity lookup is awaited in place, so its own timeout and
    /// cancellation behaviour carry through unchanged.
    pub async fn resolve(&self, headers: &HeaderMap) -> Resolution {
        let Some(token) = Self::bearer_token(headers) else {
            return Resolution::anonymous(FilterState::NoToken);
        };
        debug!(state = FilterState::TokenPresent.as_str(), "bearer token found");

        let subject = match self.validator.validate(token) {
            AuthOutcome::Valid(subject) => subject,
            outcome => {
                warn!(
                    state = FilterState::Rejected.as_str(),
                    outcome = outcome.kind(),
                    "bearer token rejected"
                );
                return Resolution::anonymous(FilterState::Rejected);
            }
        };

        let looked_up = AssertUnwindSafe(self.lookup.authorities(&subject))
            .catch_unwind()
            .await;

        match looked_up {
            Ok(Ok(authorities)) => {
                debug!(
                    state = FilterState::Authenticated.as_str(),
                    subject = %subject,
                    authorities = authorities.len(),
                    "request authenticated"
                );
                Resolution {
                    state: FilterState::Authenticated,
                    identity: Some(IdentityContext::new(subject, authorities)),
                }
            }
            Ok(Err(e)) => {
                warn!(
                    state = FilterState::Rejected.as_str(),
                    error = %e,
                    "identity lookup failed"
                );
                Resolution::anonymous(FilterState::Rejected)
            }
            Err(_) => {
                warn!(
                    state = FilterState::Rejected.as_str(),
                    "identity lookup panicked"
                );
                Resolution::anonymous(FilterState::Rejected)
            }
        }
    }
}

/// Layer the filter over every route of `router`.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, authenticate))
}

async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Whatever arrived with the request is discarded; only this filter assigns identity.
    req.extensions_mut().remove::<IdentityContext>();

    let resolution = state.auth_filter.resolve(req.headers()).await;
    if let Some(identity) = resolution.identity {
        req.extensions_mut().insert(identity);
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::num::NonZeroU64;

    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use jsonwebtoken::Algorithm;

    use super::*;
    use crate::services::auth::TokenIssuer;
    use crate::services::auth::directory::{DirectoryError, DirectoryResult};
    use crate::services::auth::signing_key::SigningKey;

    enum Lookup {
        Roles,
        Missing,
        Panics,
    }

    #[async_trait]
    impl IdentityLookup for Lookup {
        async fn exists(&self, _username: &str) -> DirectoryResult<bool> {
            Ok(true)
        }

        async fn authorities(&self, _username: &str) -> DirectoryResult<BTreeSet<String>> {
            match self {
                Lookup::Roles => Ok(BTreeSet::from(["ROLE_USER".to_string()])),
                Lookup::Missing => Err(DirectoryError::NotFound),
                Lookup::Panics => panic!("directory exploded"),
            }
        }
    }

    fn setup(lookup: Lookup) -> (TokenIssuer, AuthenticationFilter) {
        let key = Arc::new(SigningKey::from_bytes(vec![4u8; 64], Algorithm::HS512).unwrap());
        let issuer = TokenIssuer::new(key.clone(), Algorithm::HS512, NonZeroU64::new(600).unwrap());
        let validator = Arc::new(TokenValidator::new(key, Algorithm::HS512));
        (issuer, AuthenticationFilter::new(validator, Arc::new(lookup)))
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn valid_token_authenticates() {
        let (issuer, filter) = setup(Lookup::Roles);
        let token = issuer.issue("alice").unwrap().token;

        let resolution = filter.resolve(&headers(&format!("Bearer {token}"))).await;
        assert_eq!(resolution.state, FilterState::Authenticated);

        let identity = resolution.identity.unwrap();
        assert_eq!(identity.subject, "alice");
        assert!(identity.has_authority("ROLE_USER"));
    }

    #[tokio::test]
    async fn prefix_must_match_exactly() {
        let (issuer, filter) = setup(Lookup::Roles);
        let token = issuer.issue("alice").unwrap().token;

        for value in [
            format!("bearer {token}"),
            format!("BEARER {token}"),
            format!("Token {token}"),
            format!("Bearer{token}"),
            token.clone(),
        ] {
            let resolution = filter.resolve(&headers(&value)).await;
            assert_eq!(resolution.state, FilterState::NoToken);
            assert!(resolution.identity.is_none());
        }
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_no_token() {
        let (_, filter) = setup(Lookup::Roles);

        for map in [HeaderMap::new(), headers(""), headers("Bearer "), headers("Bearer    ")] {
            let resolution = filter.resolve(&map).await;
            assert_eq!(resolution, Resolution::anonymous(FilterState::NoToken));
        }
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_quietly() {
        let (_, filter) = setup(Lookup::Roles);
        for value in ["Bearer garbage", "Bearer a.b.c", "Bearer ...."] {
            let resolution = filter.resolve(&headers(value)).await;
            assert_eq!(resolution, Resolution::anonymous(FilterState::Rejected));
        }
    }

    #[tokio::test]
    async fn lookup_failure_clears_identity() {
        let (issuer, filter) = setup(Lookup::Missing);
        let token = issuer.issue("ghost").unwrap().token;

        let resolution = filter.resolve(&headers(&format!("Bearer {token}"))).await;
        assert_eq!(resolution, Resolution::anonymous(FilterState::Rejected));
    }

    #[tokio::test]
    async fn lookup_panic_is_contained() {
        let (issuer, filter) = setup(Lookup::Panics);
        let token = issuer.issue("alice").unwrap().token;

        let resolution = filter.resolve(&headers(&format!("Bearer {token}"))).await;
        assert_eq!(resolution, Resolution::anonymous(FilterState::Rejected));
    }

    #[test]
    fn non_ascii_header_is_no_token() {
        let mut map = HeaderMap::new();
        map.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );
        assert_eq!(AuthenticationFilter::bearer_token(&map), None);
    }
}

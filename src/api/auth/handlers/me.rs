use axum::Json;

use crate::api::auth::dto::responses::IdentityResponse;
use crate::api::extractors::Identity;

/// Echo the identity the authentication filter attached (401 if none).
pub async fn me(Identity(identity): Identity) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        subject: identity.subject,
        authorities: identity.authorities,
    })
}

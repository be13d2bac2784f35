//! Authentication middleware for JWT bearer tokens
//!
//! Authentication is optional: requests without an `Authorization` header
//! pass through anonymously and the handlers decide what anonymous callers
//! may do. A header that is present but invalid is always a 401.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::{error, warn};

use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// The authenticated caller, inserted into request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolve a bearer token into a [`CurrentUser`]
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if req
        .headers()
        .contains_key(axum::http::header::AUTHORIZATION)
    {
        let bearer = req
            .headers()
            .typed_get::<Authorization<Bearer>>()
            .ok_or(ApiError::Unauthorized)?;

        let claims = state
            .jwt_service
            .validate_token(bearer.token())
            .map_err(|e| {
                warn!(error = %e, "Rejected access token");
                ApiError::Unauthorized
            })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to load user for token");
                ApiError::Internal(e)
            })?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "Token names an unknown user");
                ApiError::Unauthorized
            })?;

        req.extensions_mut().insert(CurrentUser(user));
    }

    Ok(next.run(req).await)
}

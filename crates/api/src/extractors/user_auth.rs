//! Authenticated-user extractor.
//!
//! Reads the [`UserAuth`] placed in request extensions by the auth middleware,
//! validating the bearer token itself when the middleware did not run.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::UserAuth;

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(auth.clone());
        }

        UserAuth::from_headers(&parts.headers, &state.config.jwt)
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))
    }
}

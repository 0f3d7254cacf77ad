//! User JWT authentication middleware.
//!
//! Provides middleware for requiring JWT-based user authentication on routes,
//! and an admin gate on top of it.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;
use crate::config::JwtAuthConfig;
use domain::services::Actor;
use shared::jwt::{bearer_token, JwtConfig, ADMIN_ROLE};

/// Authenticated user information extracted from JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAuth {
    /// User ID from the JWT subject claim.
    pub user_id: String,
    /// Display name, falls back to the user ID.
    pub user_name: String,
    pub role: String,
}

impl UserAuth {
    /// Validates a token and returns user authentication info.
    pub fn validate(jwt_config: &JwtConfig, token: &str) -> Result<Self, String> {
        let claims = jwt_config
            .validate_token(token)
            .map_err(|e| format!("Invalid token: {}", e))?;

        if claims.sub.is_empty() {
            return Err("Token has no subject".to_string());
        }

        let user_name = if claims.name.is_empty() {
            claims.sub.clone()
        } else {
            claims.name
        };

        Ok(UserAuth {
            user_id: claims.sub,
            user_name,
            role: claims.role,
        })
    }

    /// Creates a JwtConfig from JwtAuthConfig.
    pub fn create_jwt_config(config: &JwtAuthConfig) -> Result<JwtConfig, String> {
        JwtConfig::new(&config.secret, config.token_expiry_secs, config.leeway_secs)
            .map_err(|e| format!("Failed to initialize JWT config: {}", e))
    }

    /// Decodes the bearer token of a request if there is a valid one.
    pub fn from_headers(headers: &HeaderMap, config: &JwtAuthConfig) -> Option<Self> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)?;
        let jwt_config = Self::create_jwt_config(config).ok()?;
        Self::validate(&jwt_config, token).ok()
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn actor(&self, ip_address: Option<String>) -> Actor {
        Actor::new(self.user_id.clone(), self.user_name.clone()).with_ip_address(ip_address)
    }
}

/// Validates the bearer token or produces the rejection response.
fn authenticate(state: &AppState, req: &Request<Body>) -> Result<UserAuth, Response> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| unauthorized_response("Missing or invalid Authorization header"))?;

    let jwt_config = UserAuth::create_jwt_config(&state.config.jwt).map_err(|e| {
        tracing::error!("Failed to create JWT config: {}", e);
        internal_error_response("Authentication service unavailable")
    })?;

    UserAuth::validate(&jwt_config, token).map_err(|e| {
        tracing::debug!("JWT validation failed: {}", e);
        unauthorized_response("Invalid or expired token")
    })
}

/// Middleware that requires JWT user authentication.
///
/// Authenticated user information is stored in request extensions for use by
/// downstream handlers.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, &req) {
        Ok(auth) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(response) => response,
    }
}

/// Middleware that requires an authenticated user with the admin role.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth = match authenticate(&state, &req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };

    if !auth.is_admin() {
        tracing::warn!(
            user_id = %auth.user_id,
            path = %req.uri().path(),
            "Admin access denied"
        );
        return forbidden_response("Administrator role required");
    }

    req.extensions_mut().insert(auth);
    next.run(req).await
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": message
        })),
    )
        .into_response()
}

fn internal_error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": message
        })),
    )
        .into_response()
}

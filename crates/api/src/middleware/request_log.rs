//! Request/response taps.
//!
//! Every request outside the exclusion list gets a transport log line on the
//! way in and on the way out. Mutating requests and failed responses are also
//! mirrored into the event log through the [`AuditDispatcher`], without
//! waiting for the write.
//!
//! [`AuditDispatcher`]: crate::services::AuditDispatcher

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT},
        HeaderMap, Method, Request, StatusCode,
    },
    middleware::Next,
    response::Response,
};
use domain::models::{LogLevel, LogSource, NewLogRecord, GENERAL};
use serde_json::{json, Value as JsonValue};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::extractors::client_ip;
use crate::middleware::trace_id::get_request_id;
use crate::middleware::user_auth::UserAuth;

/// Paths never logged by the taps.
pub const EXCLUDED_PATHS: [&str; 3] = ["/api/health", "/favicon.ico", "/metrics"];

/// Path prefix of static assets, never logged by the taps.
pub const STATIC_PREFIX: &str = "/static/";

/// Requests to the log API are not mirrored into the log they manage.
pub const LOGS_API_PREFIX: &str = "/api/v1/logs";

/// Unauthenticated endpoints, not mirrored into the event log.
pub const PUBLIC_PREFIXES: [&str; 2] = ["/api/v1/auth/", "/api/v1/public/"];

/// Stored in place of bodies that are too large or not JSON.
pub const BODY_OMITTED: &str = "[omitted]";

pub fn is_excluded(path: &str) -> bool {
    path.starts_with(STATIC_PREFIX)
        || EXCLUDED_PATHS
            .iter()
            .any(|p| path == *p || path.strip_prefix(p).is_some_and(|rest| rest.starts_with('/')))
}

pub fn is_read_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Whether traffic on this path may produce event log records.
pub fn is_audited_path(path: &str) -> bool {
    let logs_api = path == LOGS_API_PREFIX
        || path
            .strip_prefix(LOGS_API_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'));

    !logs_api && !PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// First path segment below the API prefix, e.g. `customers`.
pub fn module_for(path: &str) -> String {
    let rest = path
        .strip_prefix("/api/v1/")
        .or_else(|| path.strip_prefix("/api/"))
        .unwrap_or_else(|| path.trim_start_matches('/'));

    rest.split('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(GENERAL)
        .to_string()
}

pub fn action_for(method: &Method) -> String {
    match *method {
        Method::POST => "create".to_string(),
        Method::PUT | Method::PATCH => "update".to_string(),
        Method::DELETE => "delete".to_string(),
        _ => method.as_str().to_lowercase(),
    }
}

/// Transport level of a completed request.
pub fn response_level(status: StatusCode, method: &Method) -> LogLevel {
    if status.is_server_error() {
        LogLevel::Error
    } else if status.is_client_error() {
        LogLevel::Warning
    } else if *method != Method::GET {
        LogLevel::Info
    } else {
        LogLevel::Debug
    }
}

/// Request facts shared by both taps.
#[derive(Debug, Clone)]
struct RequestContext {
    method: Method,
    path: String,
    query: Option<String>,
    request_id: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    user: Option<UserAuth>,
}

impl RequestContext {
    fn from_request(req: &Request<Body>, state: &AppState) -> Self {
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(String::from),
            request_id: get_request_id(req.extensions()),
            user_agent: req
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            ip_address: client_ip(req.headers(), req.extensions()),
            user: UserAuth::from_headers(req.headers(), &state.config.jwt),
        }
    }

    fn user_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.user_name.as_str())
            .unwrap_or(domain::models::SYSTEM_ACTOR)
    }

    fn base_record(&self, level: LogLevel, message: String, source: LogSource) -> NewLogRecord {
        let record = NewLogRecord::new(level, message)
            .with_module(module_for(&self.path))
            .with_action(action_for(&self.method))
            .with_source(source)
            .with_ip_address(self.ip_address.clone())
            .add_detail("method", json!(self.method.as_str()))
            .add_detail("path", json!(self.path))
            .add_detail("query", json!(self.query))
            .add_detail("requestId", json!(self.request_id))
            .add_detail("userAgent", json!(self.user_agent));

        match &self.user {
            Some(user) => record.with_actor(user.user_id.clone(), user.user_name.clone()),
            None => record,
        }
    }

    fn request_record(&self, body: JsonValue) -> NewLogRecord {
        self.base_record(
            LogLevel::Info,
            format!("{} {}", self.method, self.path),
            LogSource::ApiRequest,
        )
        .add_detail("body", body)
    }

    fn response_record(&self, status: StatusCode, duration_ms: u64) -> NewLogRecord {
        let level = if status.is_server_error() {
            LogLevel::Error
        } else {
            LogLevel::Warning
        };

        self.base_record(
            level,
            format!("{} {} -> {}", self.method, self.path, status.as_u16()),
            LogSource::ApiResponse,
        )
        .add_detail("statusCode", json!(status.as_u16()))
        .add_detail("durationMs", json!(duration_ms))
    }
}

/// Tap middleware. Must run inside [`trace_id`](super::trace_id::trace_id).
pub async fn request_log(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_excluded(req.uri().path()) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let ctx = RequestContext::from_request(&req, &state);
    let read_only = is_read_method(&ctx.method);
    let audited = is_audited_path(&ctx.path);

    if read_only {
        debug!(target: "http", method = %ctx.method, path = %ctx.path, user = %ctx.user_name(), "Request received");
    } else {
        info!(target: "http", method = %ctx.method, path = %ctx.path, user = %ctx.user_name(), "Request received");
    }

    let req = if !read_only && audited {
        let (req, body) = capture_body(req, state.config.audit.max_body_bytes).await;
        state.audit.dispatch(ctx.request_record(body));
        req
    } else {
        req
    };

    let response = next.run(req).await;
    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    let code = status.as_u16();
    match response_level(status, &ctx.method) {
        LogLevel::Error => error!(target: "http", method = %ctx.method, path = %ctx.path, status = code, duration_ms, "Request completed"),
        LogLevel::Warning => warn!(target: "http", method = %ctx.method, path = %ctx.path, status = code, duration_ms, "Request completed"),
        LogLevel::Info => info!(target: "http", method = %ctx.method, path = %ctx.path, status = code, duration_ms, "Request completed"),
        LogLevel::Debug => debug!(target: "http", method = %ctx.method, path = %ctx.path, status = code, duration_ms, "Request completed"),
    }

    if audited && (status.is_client_error() || status.is_server_error()) {
        state.audit.dispatch(ctx.response_record(status, duration_ms));
    }

    response
}

/// Buffers a small JSON body and returns it masked, restoring the request.
///
/// Bodies that are empty yield `null`; bodies that are not JSON, have no
/// declared length or exceed `max_bytes` are not read and yield the omission
/// marker. A body that fails to read is also omitted and the request goes on
/// with an empty body, so the handler decides the outcome.
pub async fn capture_body(req: Request<Body>, max_bytes: usize) -> (Request<Body>, JsonValue) {
    let content_length = declared_length(req.headers());
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    match content_length {
        Some(0) => return (req, JsonValue::Null),
        None if !is_json && !req.headers().contains_key(CONTENT_TYPE) => {
            return (req, JsonValue::Null)
        }
        Some(len) if is_json && len <= max_bytes => {}
        _ => return (req, json!(BODY_OMITTED)),
    }

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, max_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(target: "audit", path = %parts.uri.path(), error = %e, "Failed to read request body");
            return (Request::from_parts(parts, Body::empty()), json!(BODY_OMITTED));
        }
    };

    let value = match serde_json::from_slice::<JsonValue>(&bytes) {
        Ok(value) => shared::masking::masked(&value),
        Err(_) => json!(BODY_OMITTED),
    };

    (Request::from_parts(parts, Body::from(bytes)), value)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

//! HTTP routes for SawiTrack
//!
//! The server collects each request body up front and hands an [`ApiRequest`]
//! to [`dispatch`].

pub mod activity;
pub mod closing;
pub mod health;
pub mod records;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::auth::{authenticate, Actor};
use crate::records::RecordKind;
use crate::server::AppState;
use crate::types::{Result, SawitError};

pub use health::{health_check, readiness_check, version_info};

type FullBody = Full<Bytes>;

/// A fully-read HTTP request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            authorization: None,
            body: Bytes::new(),
        }
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.authorization = Some(format!("Bearer {}", token));
        self
    }

    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self
    }

    /// Deserialize the JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Err(SawitError::validation("Request body is required"));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Route a request
pub async fn dispatch(state: &AppState, req: ApiRequest) -> Response<FullBody> {
    if req.method == Method::OPTIONS {
        return preflight_response();
    }

    match (req.method.clone(), req.path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => health_check(state),
        (Method::GET, "/ready") | (Method::GET, "/readyz") => readiness_check(state).await,
        (Method::GET, "/version") => version_info(),
        (_, p) if p.starts_with("/api/") => match handle_api(state, &req).await {
            Ok(response) => response,
            Err(e) => error_response(e),
        },
        _ => error_response(SawitError::not_found(format!("Route not found: {}", req.path))),
    }
}

async fn handle_api(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let segments: Vec<&str> = req
        .path
        .trim_start_matches("/api/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let actor = authenticate(&state.jwt, req.authorization.as_deref(), state.args.dev_mode)?;

    match segments.as_slice() {
        ["closing-periods", rest @ ..] => closing::handle(state, req, &actor, rest).await,
        ["closed-months"] if req.method == Method::GET => closing::closed_months(state, &actor).await,
        ["activity-logs"] if req.method == Method::GET => activity::recent(state, req, &actor).await,
        [segment, rest @ ..] => match RecordKind::from_segment(segment) {
            Some(kind) => records::handle(state, req, &actor, kind, rest).await,
            None => Err(SawitError::not_found(format!("Route not found: {}", req.path))),
        },
        [] => Err(SawitError::not_found("Route not found: /api/")),
    }
}

/// Display name of the actor for audit fields
pub(crate) fn actor_name(actor: &Actor) -> Option<String> {
    Some(actor.name.clone()).filter(|n| !n.is_empty())
}

pub(crate) fn method_not_allowed(req: &ApiRequest) -> SawitError {
    SawitError::not_found(format!("Route not found: {} {}", req.method, req.path))
}

// =============================================================================
// Response Helpers
// =============================================================================

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|e| {
        error!("Failed to serialize response: {}", e);
        "{}".to_string()
    });
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// `{"error": message}` with the error's status
pub fn error_response(err: SawitError) -> Response<FullBody> {
    if err.status_code().is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, "Request rejected");
    }
    let (status, body) = err.into_status_code_and_body();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// CORS preflight response
fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query() {
        let req = ApiRequest::new(Method::GET, "/api/reports?startDate=2025-01-01");
        assert_eq!(req.path, "/api/reports");
        assert_eq!(req.query.as_deref(), Some("startDate=2025-01-01"));
    }

    #[test]
    fn test_empty_body_is_validation_error() {
        let req = ApiRequest::new(Method::POST, "/api/reports");
        let err = req.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, SawitError::Validation(_)));
    }

    #[test]
    fn test_error_response_shape() {
        let response = error_response(SawitError::not_found("Report not found"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}

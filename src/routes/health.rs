//! Health check endpoints
//!
//! - /health, /healthz - Liveness probe (is the process serving?)
//! - /ready, /readyz - Readiness probe (is the record store reachable?)
//! - /version - build information

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::json_response;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    /// 'online' or 'degraded'
    pub status: &'static str,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    pub mode: &'static str,
    pub node_id: String,
    /// Storage backend: 'mongodb' or 'memory'
    pub storage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn build_health_response(state: &AppState, store_error: Option<String>) -> HealthResponse {
    HealthResponse {
        healthy: store_error.is_none(),
        status: if store_error.is_none() { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        storage: state.storage,
        error: store_error,
    }
}

/// Liveness: 200 whenever the process is serving
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &build_health_response(state, None))
}

/// Readiness: 200 only when the record store answers a ping
pub async fn readiness_check(state: &AppState) -> Response<Full<Bytes>> {
    let store_error = state.records.store().ping().await.err().map(|e| e.to_string());
    let status = if store_error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, &build_health_response(state, store_error))
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Build information for deployment verification
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "sawitrack",
    };
    json_response(StatusCode::OK, &response)
}

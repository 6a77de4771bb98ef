//! Activity log endpoint: `GET /api/activity-logs?limit=N`

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;

use super::{json_response, ApiRequest};
use crate::auth::{Actor, Operation};
use crate::server::AppState;
use crate::types::{Result, SawitError};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

#[derive(Deserialize, Default)]
struct LimitQuery {
    limit: Option<usize>,
}

/// Most recent activity entries, newest first
pub async fn recent(state: &AppState, req: &ApiRequest, actor: &Actor) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ReadActivity)?;

    let query: LimitQuery = match req.query.as_deref() {
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| SawitError::validation(format!("Invalid query: {}", e)))?,
        None => LimitQuery::default(),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let entries = state.activity.recent(limit).await?;
    Ok(json_response(StatusCode::OK, &entries))
}

//! Gated record endpoints
//!
//! One set of routes per [`RecordKind`], mounted at `/api/{segment}`. Every
//! write goes through [`crate::records::RecordService`], which runs the
//! closing check before touching the store.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{actor_name, json_response, method_not_allowed, ApiRequest};
use crate::auth::{Actor, Operation};
use crate::records::{DateRange, RecordKind};
use crate::server::AppState;
use crate::types::{Result, SawitError};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RecapQuery {
    group_by: Option<String>,
}

/// Route `/api/{segment}[/...]`
pub async fn handle(
    state: &AppState,
    req: &ApiRequest,
    actor: &Actor,
    kind: RecordKind,
    rest: &[&str],
) -> Result<Response<Full<Bytes>>> {
    match (&req.method, rest) {
        (&Method::GET, []) => list(state, req, actor, kind).await,
        (&Method::POST, []) => create(state, req, actor, kind).await,
        (&Method::GET, ["recap"]) => recap(state, req, actor, kind).await,
        (&Method::GET, [id]) => get(state, actor, kind, id).await,
        (&Method::PUT, [id]) => update(state, req, actor, kind, id).await,
        (&Method::DELETE, [id]) => delete(state, actor, kind, id).await,
        _ => Err(method_not_allowed(req)),
    }
}

async fn list(state: &AppState, req: &ApiRequest, actor: &Actor, kind: RecordKind) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ReadRecords)?;
    let range = DateRange::from_query(req.query.as_deref())?;
    let records = state.records.list(kind, range).await?;
    Ok(json_response(StatusCode::OK, &records))
}

async fn get(state: &AppState, actor: &Actor, kind: RecordKind, id: &str) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ReadRecords)?;
    let record = state.records.get(kind, id).await?;
    Ok(json_response(StatusCode::OK, &record))
}

async fn create(state: &AppState, req: &ApiRequest, actor: &Actor, kind: RecordKind) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::WriteRecords)?;
    let body: Value = req.json()?;
    let record = state.records.create(kind, body, actor_name(actor)).await?;
    Ok(json_response(StatusCode::CREATED, &record))
}

async fn update(
    state: &AppState,
    req: &ApiRequest,
    actor: &Actor,
    kind: RecordKind,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::WriteRecords)?;
    let patch: Value = req.json()?;
    let record = state.records.update(kind, id, patch, actor_name(actor)).await?;
    Ok(json_response(StatusCode::OK, &record))
}

async fn delete(state: &AppState, actor: &Actor, kind: RecordKind, id: &str) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::WriteRecords)?;
    state.records.delete(kind, id, actor_name(actor)).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "success": true,
            "message": format!("{} berhasil dihapus", kind.label()),
        }),
    ))
}

async fn recap(state: &AppState, req: &ApiRequest, actor: &Actor, kind: RecordKind) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ReadRecords)?;
    let range = DateRange::from_query(req.query.as_deref())?;
    let query: RecapQuery = match req.query.as_deref() {
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| SawitError::validation(format!("Invalid query: {}", e)))?,
        None => RecapQuery::default(),
    };
    let summary = state.records.recap(kind, range, query.group_by.as_deref()).await?;
    Ok(json_response(StatusCode::OK, &summary))
}

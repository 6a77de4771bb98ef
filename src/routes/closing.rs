//! Closing period endpoints
//!
//! - `POST /api/closing-periods` - close a period (manager)
//! - `GET /api/closing-periods` - list periods
//! - `GET /api/closing-periods/check?date=YYYY-MM-DD` - is a day closed
//! - `DELETE /api/closing-periods/:id` - reopen (manager)
//! - `GET /api/closed-months` - closed (year, month) pairs

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{actor_name, json_response, method_not_allowed, ApiRequest};
use crate::activity::{spawn_activity, ActivityAction, ActivityEntry};
use crate::auth::{Actor, Operation};
use crate::closing::ClosePeriodRequest;
use crate::db::schemas::CLOSING_PERIOD_COLLECTION;
use crate::server::AppState;
use crate::types::{format_day, parse_day, Result, SawitError};

#[derive(Deserialize, Default)]
struct CheckQuery {
    date: Option<String>,
}

/// Route `/api/closing-periods[/...]`
pub async fn handle(
    state: &AppState,
    req: &ApiRequest,
    actor: &Actor,
    rest: &[&str],
) -> Result<Response<Full<Bytes>>> {
    match (&req.method, rest) {
        (&Method::GET, []) => list_periods(state, actor).await,
        (&Method::POST, []) => close_period(state, req, actor).await,
        (&Method::GET, ["check"]) => check_date(state, req, actor).await,
        (&Method::DELETE, [id]) => reopen_period(state, actor, id).await,
        _ => Err(method_not_allowed(req)),
    }
}

async fn close_period(state: &AppState, req: &ApiRequest, actor: &Actor) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ClosePeriod)?;

    let body: ClosePeriodRequest = req.json()?;
    let period = body.into_new_period(actor_name(actor))?;
    let created = state.registry.create_closing_period(period).await?;

    spawn_activity(
        state.activity.clone(),
        ActivityEntry::new(ActivityAction::ClosePeriod, CLOSING_PERIOD_COLLECTION)
            .with_user(actor_name(actor))
            .with_entity_id(created.id.clone())
            .with_details(format!(
                "Closed {:04}-{:02} ({} to {})",
                created.year, created.month, created.start_date, created.end_date
            )),
    );

    Ok(json_response(StatusCode::CREATED, &created))
}

async fn list_periods(state: &AppState, actor: &Actor) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ReadClosing)?;
    let periods = state.registry.list().await?;
    Ok(json_response(StatusCode::OK, &periods))
}

async fn check_date(state: &AppState, req: &ApiRequest, actor: &Actor) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ReadClosing)?;

    let query: CheckQuery = match req.query.as_deref() {
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| SawitError::validation(format!("Invalid query: {}", e)))?,
        None => CheckQuery::default(),
    };
    let raw = query
        .date
        .ok_or_else(|| SawitError::validation("Query parameter 'date' is required"))?;
    let day = parse_day(&raw).ok_or_else(|| SawitError::validation(format!("Invalid date: {}", raw)))?;

    let covering = state.registry.find_covering(day).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "date": format_day(day),
            "closed": covering.is_some(),
            "period": covering,
        }),
    ))
}

async fn reopen_period(state: &AppState, actor: &Actor, id: &str) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ReopenPeriod)?;

    let removed = state.registry.reopen_period(id).await?;

    spawn_activity(
        state.activity.clone(),
        ActivityEntry::new(ActivityAction::ReopenPeriod, CLOSING_PERIOD_COLLECTION)
            .with_user(actor_name(actor))
            .with_entity_id(removed.id.clone())
            .with_details(format!("Reopened {:04}-{:02}", removed.year, removed.month)),
    );

    Ok(json_response(
        StatusCode::OK,
        &json!({
            "success": true,
            "message": "Periode berhasil dibuka kembali",
            "period": removed,
        }),
    ))
}

/// `GET /api/closed-months`
pub async fn closed_months(state: &AppState, actor: &Actor) -> Result<Response<Full<Bytes>>> {
    actor.require(Operation::ReadClosing)?;
    let months = state.registry.list_closed_months().await?;
    Ok(json_response(StatusCode::OK, &months))
}

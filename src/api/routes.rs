//! API route definitions.
//!
//! Every scheduled-action route is tenant-scoped through the `TenantContext`
//! extractor. Validation errors map to 400; cross-tenant access and edits of
//! records that are no longer editable both map to 404 (never 403, so
//! existence cannot leak); execute/retry state conflicts map to 409.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::context::TenantContext;
use crate::error::EngineError;
use crate::model::{NewScheduledAction, ScheduleStatus, ScheduledActionPatch};
use crate::templates;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/scheduled-actions", get(list_scheduled).post(create_scheduled))
        .route(
            "/scheduled-actions/{id}",
            get(get_scheduled)
                .patch(update_scheduled)
                .delete(delete_scheduled),
        )
        .route("/scheduled-actions/{id}/execute", post(execute_now))
        .route("/scheduled-actions/{id}/retry", post(retry_scheduled))
        .route("/execution-logs", get(list_execution_logs))
        .route("/templates", get(list_templates))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound => StatusCode::NOT_FOUND,
            EngineError::InvalidState(_) => StatusCode::CONFLICT,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_scheduled(
    ctx: TenantContext,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let records = state.store.list(&ctx.tenant_id)?;
    let total = records.len();
    Ok(Json(json!({ "data": records, "meta": { "total": total } })))
}

async fn create_scheduled(
    ctx: TenantContext,
    State(state): State<AppState>,
    Json(input): Json<NewScheduledAction>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let record = state.store.create(input, &ctx)?;
    Ok((StatusCode::CREATED, Json(json!({ "data": record }))))
}

async fn get_scheduled(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let record = state.store.get(id, &ctx.tenant_id)?;
    Ok(Json(json!({ "data": record })))
}

async fn update_scheduled(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ScheduledActionPatch>,
) -> Result<Json<Value>, ApiError> {
    let record = state.store.update(id, patch, &ctx.tenant_id)?;
    Ok(Json(json!({ "data": record })))
}

async fn delete_scheduled(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.remove(id, &ctx.tenant_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bypass the scheduled time and run the record now, through the same claim
/// and dispatch path as the poller. Awaited to completion so the caller gets
/// the confirmed terminal state back in one round trip.
async fn execute_now(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let record = state.store.get(id, &ctx.tenant_id)?;
    if record.status != ScheduleStatus::Scheduled {
        return Err(ApiError(EngineError::InvalidState(format!(
            "record is {}, only scheduled records can be executed",
            record.status
        ))));
    }
    let claimed = state.dispatcher.dispatch(&record).await?;
    if !claimed {
        return Err(ApiError(EngineError::InvalidState(
            "record was claimed by a concurrent dispatch".to_string(),
        )));
    }
    let finished = state.store.get(id, &ctx.tenant_id)?;
    Ok(Json(json!({ "data": finished })))
}

#[derive(Deserialize)]
struct RetryBody {
    scheduled_at: Option<DateTime<Utc>>,
}

async fn retry_scheduled(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: axum::body::Bytes,
) -> Result<Json<Value>, ApiError> {
    // The body is optional; an empty body means "reschedule for now".
    let scheduled_at = if body.is_empty() {
        None
    } else {
        let parsed: RetryBody = serde_json::from_slice(&body)
            .map_err(|e| EngineError::Validation(format!("invalid retry body: {e}")))?;
        parsed.scheduled_at
    };
    let record = state.store.retry(id, &ctx.tenant_id, scheduled_at)?;
    Ok(Json(json!({ "data": record })))
}

#[derive(Deserialize)]
struct LogQuery {
    user: Option<String>,
    limit: Option<usize>,
}

async fn list_execution_logs(
    ctx: TenantContext,
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(500);
    let runs = state
        .audit
        .list(&ctx.tenant_id, query.user.as_deref(), limit)?;
    let total = runs.len();
    Ok(Json(json!({ "data": runs, "meta": { "total": total } })))
}

async fn list_templates() -> Json<Value> {
    Json(json!({ "data": templates::TEMPLATES, "meta": { "total": templates::TEMPLATES.len() } }))
}

//! HTTP surface: status, manual trigger, and the approval queue.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use satchel_domain::{EnrichedEvent, RunStatus, SatchelError};
use serde::Serialize;
use tracing::error;

use crate::context::AppContext;

pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/trigger", post(trigger))
        .route("/api/events/pending", get(pending_events))
        .route("/api/events/:identity/approve", post(approve_event))
        .route("/api/events/:identity/reject", post(reject_event))
        .with_state(context)
}

#[derive(Serialize)]
struct StatusResponse {
    status: RunStatus,
    last_run: Option<String>,
    pending: usize,
    logs: Vec<String>,
}

async fn status(State(context): State<Arc<AppContext>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: context.pipeline.status(),
        last_run: context.pipeline.last_run().map(|ts| ts.to_rfc3339()),
        pending: context.staging.pending_count(),
        logs: context.run_log.lines(),
    })
}

#[derive(Serialize)]
struct TriggerResponse {
    status: &'static str,
}

/// Kick off a pipeline run in the background. A run in progress is
/// rejected, never queued.
async fn trigger(State(context): State<Arc<AppContext>>) -> Response {
    if context.pipeline.status() == RunStatus::Running {
        return error_response(StatusCode::CONFLICT, "a pipeline run is already active");
    }

    let pipeline = context.pipeline.clone();
    tokio::spawn(async move {
        // a run that slipped in between the check and here rejects itself
        if let Err(err) = pipeline.run().await {
            error!(error = %err, "triggered pipeline run failed");
        }
    });

    (StatusCode::OK, Json(TriggerResponse { status: "STARTED" })).into_response()
}

async fn pending_events(State(context): State<Arc<AppContext>>) -> Json<Vec<EnrichedEvent>> {
    Json(context.staging.list_pending())
}

#[derive(Serialize)]
struct ApproveResponse {
    link: String,
}

async fn approve_event(
    State(context): State<Arc<AppContext>>,
    Path(identity): Path<String>,
) -> Response {
    match context.staging.approve(&identity).await {
        Ok(link) => (StatusCode::OK, Json(ApproveResponse { link })).into_response(),
        Err(SatchelError::NotFound(message)) => error_response(StatusCode::NOT_FOUND, &message),
        Err(SatchelError::Commit(message)) => {
            error!(identity, %message, "calendar commit failed");
            error_response(StatusCode::BAD_GATEWAY, &message)
        }
        Err(err) => {
            error!(identity, error = %err, "approve failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

#[derive(Serialize)]
struct RejectResponse {
    removed: bool,
}

async fn reject_event(
    State(context): State<Arc<AppContext>>,
    Path(identity): Path<String>,
) -> Json<RejectResponse> {
    Json(RejectResponse { removed: context.staging.reject(&identity) })
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(code: StatusCode, message: &str) -> Response {
    (code, Json(ErrorBody { error: message.to_string() })).into_response()
}

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use homesync_api::restful::{ActionResponse, HealthResponse, WebhookPayload};
use time::OffsetDateTime;

use crate::errors::{ActionError, PayloadError};
use crate::services::{DeviceOrchestrator, IngestOutcome};

#[derive(Clone)]
pub struct WebhookState {
    pub orchestrator: Arc<DeviceOrchestrator>,
}

pub fn webhook_router(webhook_state: WebhookState) -> Router {
    Router::new()
        .route("/api/webhook/tuya/status", post(receive_tuya_status))
        .route("/api/webhook/health", get(webhook_health))
        .with_state(webhook_state)
}

#[utoipa::path(
    post,
    path = "/api/webhook/tuya/status",
    tag = "webhook",
    request_body = WebhookPayload,
    responses(
        (status = 200, description = "Webhook processed", body = ActionResponse),
        (status = 400, description = "Malformed payload", body = ActionResponse),
        (status = 500, description = "Internal server error", body = ActionResponse)
    )
)]
pub async fn receive_tuya_status(
    State(state): State<WebhookState>,
    body: Bytes,
) -> Result<Json<ActionResponse>, ActionError> {
    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| PayloadError::MalformedPayload(e.to_string()))?;

    tracing::info!(device = %payload.dev_id, data_id = ?payload.data_id, ts = payload.ts, "Received status webhook");

    match state.orchestrator.ingest_webhook(&payload).await? {
        IngestOutcome::Processed { fired, .. } => {
            tracing::debug!(device = %payload.dev_id, rules = fired.len(), "Status webhook applied");
        }
        IngestOutcome::UnknownDevice => {}
    }

    Ok(Json(ActionResponse::ok("Webhook processed successfully")))
}

#[utoipa::path(
    get,
    path = "/api/webhook/health",
    tag = "webhook",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn webhook_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

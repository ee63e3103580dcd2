use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router, middleware};
use homesync_api::restful::*;

use crate::errors::{ActionError, ApiError, DeviceError, PayloadError};
use crate::middlewares::{TokenState, auth};
use crate::services::{ControlOutcome, DeviceOrchestrator, TokenClaims};

#[derive(Clone)]
pub struct DeviceState {
    pub orchestrator: Arc<DeviceOrchestrator>,
}

pub fn device_router(device_state: DeviceState, token_state: TokenState) -> Router {
    Router::new()
        .route("/api/devices", get(get_devices))
        .route("/api/devices/sync", post(sync_devices))
        .route("/api/devices/control", post(control_device))
        .route("/api/devices/:device_id", get(get_device_by_id))
        .route("/api/devices/:device_id/status", get(get_device_status))
        .route("/api/devices/:device_id/refresh", post(refresh_device_status))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(device_state)
}

#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "device",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Devices of the caller, by name", body = Vec<DeviceResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_devices(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<DeviceState>,
) -> Result<Json<Vec<DeviceResponse>>, ApiError> {
    let devices = state
        .orchestrator
        .registry()
        .find_by_user(token_data.sub)
        .await?;

    Ok(Json(devices.into_iter().map(DeviceResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/devices/sync",
    tag = "device",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Devices synced", body = ActionResponse),
        (status = 400, description = "Cloud account not linked", body = ActionResponse),
        (status = 502, description = "Cloud unavailable", body = ActionResponse)
    )
)]
pub async fn sync_devices(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<DeviceState>,
) -> Result<Json<ActionResponse>, ActionError> {
    let devices = state.orchestrator.sync_devices(token_data.sub).await?;

    Ok(Json(ActionResponse::ok(format!(
        "Successfully synced {} devices",
        devices.len()
    ))))
}

#[utoipa::path(
    post,
    path = "/api/devices/control",
    tag = "device",
    request_body = DeviceControlRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Command accepted by the device cloud", body = ActionResponse),
        (status = 400, description = "Invalid command", body = ActionResponse),
        (status = 403, description = "Device owned by someone else", body = ActionResponse),
        (status = 404, description = "Device not found", body = ActionResponse),
        (status = 502, description = "Command not delivered", body = ActionResponse)
    )
)]
pub async fn control_device(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<DeviceState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ActionResponse>), ActionError> {
    let request: DeviceControlRequest = serde_json::from_slice(&body)
        .map_err(|e| PayloadError::MalformedPayload(e.to_string()))?;

    match state.orchestrator.control_device(token_data.sub, &request).await? {
        ControlOutcome::Controlled => Ok((
            StatusCode::OK,
            Json(ActionResponse::ok("Device controlled successfully")),
        )),
        ControlOutcome::Failed => Ok((
            StatusCode::BAD_GATEWAY,
            Json(ActionResponse::failed("Failed to control device")),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/devices/{device_id}",
    tag = "device",
    params(
        ("device_id" = i32, Path, description = "Internal device ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Device with its recent logs", body = DeviceDetailResponse),
        (status = 403, description = "Device owned by someone else"),
        (status = 404, description = "Device not found")
    )
)]
pub async fn get_device_by_id(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<DeviceState>,
    Path(device_id): Path<i32>,
) -> Result<Json<DeviceDetailResponse>, ApiError> {
    let device = state
        .orchestrator
        .registry()
        .find_by_internal_id(device_id)
        .await?
        .ok_or(DeviceError::DeviceNotFound)?;

    if !device.is_owned_by(token_data.sub) {
        return Err(DeviceError::InsufficientPermission.into());
    }

    let logs = state
        .orchestrator
        .audit()
        .recent(token_data.sub, Some(device.id))
        .await?;

    Ok(Json(DeviceDetailResponse {
        device: device.into(),
        logs: logs.into_iter().map(DeviceLogResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/devices/{device_id}/status",
    tag = "device",
    params(
        ("device_id" = String, Path, description = "Cloud device ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Live status from the device cloud", body = DeviceStatusResponse),
        (status = 403, description = "Device owned by someone else", body = ActionResponse),
        (status = 404, description = "Device not found", body = ActionResponse),
        (status = 502, description = "Cloud unavailable", body = ActionResponse)
    )
)]
pub async fn get_device_status(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<DeviceState>,
    Path(external_id): Path<String>,
) -> Result<Json<DeviceStatusResponse>, ActionError> {
    let status = state
        .orchestrator
        .live_status(token_data.sub, &external_id)
        .await?;

    Ok(Json(DeviceStatusResponse {
        success: true,
        status,
    }))
}

#[utoipa::path(
    post,
    path = "/api/devices/{device_id}/refresh",
    tag = "device",
    params(
        ("device_id" = String, Path, description = "Cloud device ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Status polled and applied", body = DeviceStatusResponse),
        (status = 403, description = "Device owned by someone else", body = ActionResponse),
        (status = 404, description = "Device not found", body = ActionResponse),
        (status = 502, description = "Cloud unavailable", body = ActionResponse)
    )
)]
pub async fn refresh_device_status(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<DeviceState>,
    Path(external_id): Path<String>,
) -> Result<Json<DeviceStatusResponse>, ActionError> {
    let status = state
        .orchestrator
        .refresh_device_status(token_data.sub, &external_id)
        .await?;

    Ok(Json(DeviceStatusResponse {
        success: true,
        status,
    }))
}

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router, middleware};
use homesync_api::restful::{DeviceLogQuery, DeviceLogResponse};

use crate::errors::ApiError;
use crate::middlewares::{TokenState, auth};
use crate::services::{AuditService, TokenClaims};

#[derive(Clone)]
pub struct LogState {
    pub audit_service: AuditService,
}

pub fn log_router(log_state: LogState, token_state: TokenState) -> Router {
    Router::new()
        .route("/api/logs", get(get_logs))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(log_state)
}

#[utoipa::path(
    get,
    path = "/api/logs",
    tag = "log",
    params(DeviceLogQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Latest 100 audit entries, newest first", body = Vec<DeviceLogResponse>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_logs(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<LogState>,
    Query(query): Query<DeviceLogQuery>,
) -> Result<Json<Vec<DeviceLogResponse>>, ApiError> {
    let logs = state
        .audit_service
        .recent(token_data.sub, query.device_id)
        .await?;

    Ok(Json(logs.into_iter().map(DeviceLogResponse::from).collect()))
}

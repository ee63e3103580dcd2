use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Extension, Json, Router, middleware};
use homesync_api::restful::{ActionResponse, NotificationResponse};

use crate::errors::ApiError;
use crate::middlewares::{TokenState, auth};
use crate::services::{NotificationService, TokenClaims};

#[derive(Clone)]
pub struct NotificationState {
    pub notification_service: Arc<NotificationService>,
}

pub fn notification_router(notification_state: NotificationState, token_state: TokenState) -> Router {
    Router::new()
        .route("/api/notifications", get(get_notifications))
        .route("/api/notifications/:notification_id/read", put(mark_notification_read))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(notification_state)
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notification",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Latest 50 notifications, newest first", body = Vec<NotificationResponse>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_notifications(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<NotificationState>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state.notification_service.recent(token_data.sub).await?;

    Ok(Json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    tag = "notification",
    params(
        ("notification_id" = i32, Path, description = "Notification ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Marked as read", body = ActionResponse),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_notification_read(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<NotificationState>,
    Path(notification_id): Path<i32>,
) -> Result<Json<ActionResponse>, ApiError> {
    let updated = state
        .notification_service
        .mark_read(notification_id, token_data.sub)
        .await?;

    if !updated {
        return Err(ApiError::NotificationNotFound);
    }

    Ok(Json(ActionResponse::ok("Notification marked as read")))
}

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::get;
use axum::{Extension, Router, middleware};
use futures::stream::{self, SelectAll};
use futures::{Stream, StreamExt};
use homesync_api::restful::{EventMessage, EventQuery};
use tokio_stream::wrappers::BroadcastStream;

use crate::errors::{ApiError, DeviceError};
use crate::middlewares::{TokenState, auth};
use crate::services::event_notifier::DEVICES_SYNCED;
use crate::services::{DeviceRegistry, EventNotifier, TokenClaims, Topic};

#[derive(Clone)]
pub struct SSEState {
    pub notifier: Arc<EventNotifier>,
    pub registry: DeviceRegistry,
}

pub fn sse_router(sse_state: SSEState, token_state: TokenState) -> Router {
    Router::new()
        .route("/api/events", get(sse_handler))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(sse_state)
}

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "event",
    params(EventQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Server-sent event stream"),
        (status = 403, description = "Device owned by someone else"),
        (status = 404, description = "Device not found")
    )
)]
pub async fn sse_handler(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<SSEState>,
    Query(query): Query<EventQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let messages = user_event_stream(state.notifier, state.registry, token_data.sub, query.device).await?;

    let events = messages.filter_map(|message| {
        let event = Event::default()
            .event(message.event.clone())
            .json_data(&message)
            .ok()
            .map(Ok);
        async move { event }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Topics one client listens to.
///
/// Without a device filter every owned device is followed, including devices a later sync adds:
/// a `DevicesSynced` event on the user topic re-reads the owned devices before it is forwarded.
struct Subscription {
    streams: SelectAll<BroadcastStream<EventMessage>>,
    notifier: Arc<EventNotifier>,
    registry: DeviceRegistry,
    user_id: i32,
    follow_devices: bool,
    devices: HashSet<String>,
}

impl Subscription {
    async fn listen(&mut self, topic: Topic) {
        self.streams
            .push(BroadcastStream::new(self.notifier.subscribe(&topic).await));
    }

    async fn follow_owned_devices(&mut self) -> Result<(), sqlx::Error> {
        for device in self.registry.find_by_user(self.user_id).await? {
            if self.devices.insert(device.external_id.clone()) {
                self.listen(Topic::Device(device.external_id)).await;
            }
        }

        Ok(())
    }

    async fn next_message(&mut self) -> Option<EventMessage> {
        loop {
            match self.streams.next().await? {
                Ok(message) => {
                    if self.follow_devices && message.event == DEVICES_SYNCED {
                        if let Err(e) = self.follow_owned_devices().await {
                            tracing::warn!(user_id = self.user_id, "Failed to follow synced devices: {}", e);
                        }
                    }
                    return Some(message);
                }
                Err(e) => tracing::debug!("SSE subscriber lagging: {}", e),
            }
        }
    }
}

/// Merged event stream for `user_id`: their user topic, the broadcast topic and either the requested
/// device (which must be theirs) or all of their devices.
pub async fn user_event_stream(
    notifier: Arc<EventNotifier>,
    registry: DeviceRegistry,
    user_id: i32,
    device: Option<String>,
) -> Result<impl Stream<Item = EventMessage> + Send + 'static, ApiError> {
    let mut subscription = Subscription {
        streams: SelectAll::new(),
        notifier,
        registry,
        user_id,
        follow_devices: device.is_none(),
        devices: HashSet::new(),
    };

    match device {
        Some(external_id) => {
            let device = subscription
                .registry
                .find_by_external_id(&external_id)
                .await?
                .ok_or(DeviceError::DeviceNotFound)?;

            if !device.is_owned_by(user_id) {
                return Err(DeviceError::InsufficientPermission.into());
            }

            subscription.listen(Topic::Device(device.external_id)).await;
        }
        None => subscription.follow_owned_devices().await?,
    }

    subscription.listen(Topic::User(user_id)).await;
    subscription.listen(Topic::Broadcast).await;

    Ok(stream::unfold(subscription, |mut subscription| async move {
        let message = subscription.next_message().await?;
        Some((message, subscription))
    }))
}

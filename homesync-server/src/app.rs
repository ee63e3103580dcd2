use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::configs::{SchemaManager, Settings, Storage};
use crate::handles::*;
use crate::middlewares::TokenState;
use crate::services::{
    DeviceOrchestrator, DeviceRegistry, EventNotifier, NotificationService, ProviderClient, TokenService, TuyaClient,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        receive_tuya_status,
        webhook_health,
        get_devices,
        sync_devices,
        control_device,
        get_device_by_id,
        get_device_status,
        refresh_device_status,
        get_logs,
        get_notifications,
        mark_notification_read,
        sse_handler,
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Services shared by every router, built once per process.
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<Storage>,
    pub notifier: Arc<EventNotifier>,
    pub notification_service: Arc<NotificationService>,
    pub orchestrator: Arc<DeviceOrchestrator>,
    pub token_service: Arc<TokenService>,
}

impl AppContext {
    pub fn new(storage: Arc<Storage>, provider: Arc<dyn ProviderClient>, token_service: Arc<TokenService>) -> Self {
        let notifier = Arc::new(EventNotifier::new());
        let notification_service = Arc::new(NotificationService::new(storage.clone(), notifier.clone()));
        let orchestrator = Arc::new(DeviceOrchestrator::new(
            storage.clone(),
            provider,
            notifier.clone(),
            notification_service.clone(),
        ));

        Self {
            storage,
            notifier,
            notification_service,
            orchestrator,
            token_service,
        }
    }

    pub fn token_state(&self) -> TokenState {
        TokenState {
            token_service: self.token_service.clone(),
        }
    }

    pub fn router(&self) -> Router {
        let token_state = self.token_state();

        Router::new()
            .merge(webhook_router(WebhookState {
                orchestrator: self.orchestrator.clone(),
            }))
            .merge(device_router(
                DeviceState {
                    orchestrator: self.orchestrator.clone(),
                },
                token_state.clone(),
            ))
            .merge(log_router(
                LogState {
                    audit_service: self.orchestrator.audit().clone(),
                },
                token_state.clone(),
            ))
            .merge(notification_router(
                NotificationState {
                    notification_service: self.notification_service.clone(),
                },
                token_state.clone(),
            ))
            .merge(sse_router(
                SSEState {
                    notifier: self.notifier.clone(),
                    registry: DeviceRegistry::new(self.storage.clone()),
                },
                token_state,
            ))
            .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }
}

pub async fn create_app(settings: &Arc<Settings>) -> anyhow::Result<Router> {
    let storage = Arc::new(Storage::new(settings.database.clone(), SchemaManager::default()).await?);
    let provider: Arc<dyn ProviderClient> = Arc::new(TuyaClient::new(&settings.provider)?);
    let token_service = Arc::new(TokenService::new(settings.auth.clone()));

    let context = AppContext::new(storage, provider, token_service);

    if let Some(callback_url) = settings.provider.webhook_url.clone().filter(|url| !url.is_empty()) {
        let orchestrator = context.orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.register_webhook(&callback_url).await;
        });
    }

    Ok(context.router())
}

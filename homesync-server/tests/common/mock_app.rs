use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use homesync_api::provider::{ExternalDevice, StatusPair};
use homesync_server::app::AppContext;
use homesync_server::configs::{Auth, Storage};
use homesync_server::models::{Device, User};
use homesync_server::services::TokenService;
use homesync_server::services::provider::MockProvider;
use homesync_server::tests::{create_test_device, create_test_user, setup_test_db};
use serde_json::{Value, json};

pub struct MockApp {
    pub router: Router,
    pub context: AppContext,
    pub storage: Arc<Storage>,
    pub provider: Arc<MockProvider>,
    pub user: User,
    pub token: String,
}

impl MockApp {
    pub async fn new() -> Self {
        let storage = setup_test_db().await;
        let provider = Arc::new(MockProvider::new());
        let token_service = Arc::new(TokenService::new(Auth {
            secret: String::from("test"),
            expiration: 1000,
        }));

        let context = AppContext::new(storage.clone(), provider.clone(), token_service.clone());
        let user = create_test_user(storage.clone(), "test@test.com", Some("tuya-uid")).await;
        let token = token_service.generate_token(&user).unwrap().token;

        Self {
            router: context.router(),
            context,
            storage,
            provider,
            user,
            token,
        }
    }

    pub async fn create_other_user(&self) -> User {
        create_test_user(self.storage.clone(), "other@test.com", None).await
    }

    pub fn token_for(&self, user: &User) -> String {
        self.context.token_service.generate_token(user).unwrap().token
    }

    pub async fn create_device(&self, external_id: &str, name: &str) -> Device {
        create_test_device(self.storage.clone(), self.user.id, external_id, name).await
    }

    pub fn get(&self, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .body(Body::empty())
            .unwrap()
    }

    pub fn send(&self, method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}

pub fn external_device(id: &str, name: &str, status: Value) -> ExternalDevice {
    ExternalDevice {
        id: id.to_string(),
        name: name.to_string(),
        category: "dj".to_string(),
        product_id: "prod-1".to_string(),
        product_name: "Smart Bulb".to_string(),
        online: true,
        status: serde_json::from_value(status).unwrap(),
        icon: String::new(),
    }
}

pub fn status(code: &str, value: Value) -> StatusPair {
    StatusPair {
        code: code.to_string(),
        value,
    }
}

pub fn webhook(dev_id: &str, status: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhook/tuya/status")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "devId": dev_id, "status": status, "ts": 1700000000000i64 }).to_string(),
        ))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

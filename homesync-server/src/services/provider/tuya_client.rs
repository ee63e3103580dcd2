use async_trait::async_trait;
use homesync_api::provider::{
    Command, CommandRequest, ExternalDevice, ProviderResponse, StatusPair, TokenResult, WebhookSubscription,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

use crate::configs::Provider;
use crate::errors::ProviderError;

use super::{ProviderClient, RequestSigner, SIGN_METHOD, TokenCache};

/// Cloud error code for an expired or revoked access token.
const TOKEN_INVALID: i64 = 1010;

pub struct TuyaClient {
    http: Client,
    base_url: String,
    signer: RequestSigner,
    tokens: TokenCache,
}

impl TuyaClient {
    pub fn new(provider: &Provider) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(provider.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            signer: RequestSigner::new(&provider.client_id, &provider.client_secret),
            tokens: TokenCache::new(),
        })
    }

    async fn fetch_token(&self) -> Result<TokenResult, ProviderError> {
        let timestamp = timestamp_millis();

        let response = self
            .http
            .get(format!("{}/v1.0/token?grant_type=1", self.base_url))
            .header("client_id", self.signer.client_id())
            .header("sign", self.signer.sign_token_request(&timestamp))
            .header("t", &timestamp)
            .header("sign_method", SIGN_METHOD)
            .send()
            .await?
            .text()
            .await?;

        let envelope: ProviderResponse<TokenResult> = serde_json::from_str(&response)?;

        into_result(envelope)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<ProviderResponse<T>, ProviderError> {
        let token = self.access_token().await?;
        let timestamp = timestamp_millis();
        let sign = self.signer.sign_request(&token, &timestamp, body.as_deref());

        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .header("client_id", self.signer.client_id())
            .header("access_token", &token)
            .header("sign", sign)
            .header("t", &timestamp)
            .header("sign_method", SIGN_METHOD);

        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await?.text().await?;
        tracing::debug!(%method, path, "Provider response: {}", response);

        let envelope: ProviderResponse<T> = serde_json::from_str(&response)?;
        if !envelope.success && envelope.code == Some(TOKEN_INVALID) {
            self.tokens.invalidate().await;
        }

        Ok(envelope)
    }
}

#[async_trait]
impl ProviderClient for TuyaClient {
    async fn access_token(&self) -> Result<String, ProviderError> {
        self.tokens.get_or_refresh(|| self.fetch_token()).await
    }

    async fn list_user_devices(&self, provider_uid: &str) -> Result<Vec<ExternalDevice>, ProviderError> {
        let envelope = self
            .call(Method::GET, &format!("/v1.0/users/{provider_uid}/devices"), None)
            .await?;

        into_result(envelope)
    }

    async fn device_status(&self, external_id: &str) -> Result<Vec<StatusPair>, ProviderError> {
        let envelope = self
            .call(Method::GET, &format!("/v1.0/devices/{external_id}/status"), None)
            .await?;

        into_result(envelope)
    }

    async fn send_commands(&self, external_id: &str, commands: &[Command]) -> Result<bool, ProviderError> {
        let body = serde_json::to_string(&CommandRequest {
            commands: commands.to_vec(),
        })?;

        let envelope: ProviderResponse<serde_json::Value> = self
            .call(Method::POST, &format!("/v1.0/devices/{external_id}/commands"), Some(body))
            .await?;

        if !envelope.success {
            tracing::warn!(
                device = external_id,
                code = ?envelope.code,
                "Provider refused commands: {}",
                envelope.msg.unwrap_or_default()
            );
        }

        Ok(envelope.success)
    }

    async fn register_webhook(&self, callback_url: &str) -> Result<bool, ProviderError> {
        let body = serde_json::to_string(&WebhookSubscription::status_events(callback_url))?;

        let envelope: ProviderResponse<serde_json::Value> = self
            .call(Method::POST, "/v1.0/iot-03/devices/status/subscribe", Some(body))
            .await?;

        Ok(envelope.success)
    }
}

fn into_result<T>(envelope: ProviderResponse<T>) -> Result<T, ProviderError> {
    if !envelope.success {
        return Err(ProviderError::Rejected {
            code: envelope.code,
            message: envelope.msg.unwrap_or_default(),
        });
    }

    envelope.result.ok_or(ProviderError::EmptyResult)
}

fn timestamp_millis() -> String {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> Provider {
        Provider {
            base_url: base_url.to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            timeout: 1,
            webhook_url: None,
        }
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = TuyaClient::new(&provider("https://openapi.tuyaeu.com/")).unwrap();

        assert_eq!(client.base_url, "https://openapi.tuyaeu.com");
    }

    #[test]
    fn test_timestamp_is_millis() {
        let t = timestamp_millis();

        assert_eq!(t.len(), 13);
        assert!(t.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_envelope_outcomes() {
        let rejected: ProviderResponse<Vec<StatusPair>> = serde_json::from_value(serde_json::json!({
            "success": false,
            "code": TOKEN_INVALID,
            "msg": "token invalid"
        }))
        .unwrap();
        assert!(matches!(
            into_result(rejected),
            Err(ProviderError::Rejected { code: Some(TOKEN_INVALID), .. })
        ));

        let empty: ProviderResponse<Vec<StatusPair>> =
            serde_json::from_value(serde_json::json!({ "success": true })).unwrap();
        assert!(matches!(into_result(empty), Err(ProviderError::EmptyResult)));

        let status: ProviderResponse<Vec<StatusPair>> = serde_json::from_value(serde_json::json!({
            "success": true,
            "result": [{ "code": "switch", "value": true }]
        }))
        .unwrap();
        assert_eq!(into_result(status).unwrap()[0].code, "switch");
    }

    #[tokio::test]
    async fn test_unreachable_cloud_is_a_provider_error() {
        let client = TuyaClient::new(&provider("http://127.0.0.1:9")).unwrap();

        assert!(client.access_token().await.is_err());
    }
}

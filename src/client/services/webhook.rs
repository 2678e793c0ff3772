use std::sync::Arc;

use bon::Builder;
use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{resource_path, update_body};
use crate::{
    client::ApiClient,
    errors::{ApiError, Result},
    types::{AnyJson, Record},
    validation::require_not_empty,
    webhook::WebhookEventType,
};

/// A webhook endpoint registered with the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEventType>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Record<AnyJson>,
}

/// Input for [`WebhookService::create`].
#[derive(Builder, Clone, PartialEq, Serialize)]
pub struct NewWebhook {
    #[builder(into)]
    pub url: String,
    pub events: Vec<WebhookEventType>,
    /// Shared secret the API signs deliveries with.
    #[builder(into)]
    pub secret: Option<String>,
}

impl std::fmt::Debug for NewWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewWebhook")
            .field("url", &self.url)
            .field("events", &self.events)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Webhook endpoint operations.
#[derive(Debug, Clone)]
pub struct WebhookService {
    api: Arc<ApiClient>,
}

impl WebhookService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        WebhookService { api }
    }

    pub async fn create(&self, webhook: NewWebhook) -> Result<Webhook> {
        require_not_empty(&webhook.url, "url")?;
        Url::parse(&webhook.url).map_err(|_| ApiError::validation("Invalid url format"))?;
        if webhook.events.is_empty() {
            return Err(ApiError::validation("Events cannot be empty"));
        }

        self.api.send_data(Method::POST, "/webhooks", &webhook).await
    }

    pub async fn get(&self, webhook_id: &str) -> Result<Webhook> {
        let path = resource_path("/webhooks", webhook_id, "webhook_id")?;
        self.api.get_data(&path, &[]).await
    }

    pub async fn update(&self, webhook_id: &str, updates: &Record<AnyJson>) -> Result<Webhook> {
        let path = resource_path("/webhooks", webhook_id, "webhook_id")?;
        self.api
            .send_data(Method::PUT, &path, &update_body(updates))
            .await
    }

    pub async fn delete(&self, webhook_id: &str) -> Result<()> {
        let path = resource_path("/webhooks", webhook_id, "webhook_id")?;
        self.api.delete(&path).await?;
        Ok(())
    }

    /// Every registered endpoint; this collection is not paginated.
    pub async fn list(&self) -> Result<Vec<Webhook>> {
        self.api.get_data("/webhooks", &[]).await
    }

    pub async fn stats(&self) -> Result<Record<AnyJson>> {
        self.api.get_data("/webhooks/stats", &[]).await
    }

    /// Asks the API to send a test delivery to the endpoint.
    pub async fn test(&self, webhook_id: &str) -> Result<()> {
        let path = resource_path("/webhooks", webhook_id, "webhook_id")?;
        self.api.post(&format!("{path}/test"), None).await?;
        Ok(())
    }
}

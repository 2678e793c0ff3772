use std::sync::Arc;

use bon::Builder;
use http::Method;
use serde::{Deserialize, Serialize};

use super::{resource_path, update_body};
use crate::{
    client::{ApiClient, api::decode_data},
    errors::Result,
    types::{AnyJson, ListParams, Page, Record},
    validation::{require_not_empty, sanitize_metadata},
};

/// An application registered with the API.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Key the application authenticates with.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Record<AnyJson>>,
    #[serde(flatten)]
    pub extra: Record<AnyJson>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("status", &self.status)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("metadata", &self.metadata)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Input for [`AppService::create`].
#[derive(Builder, Debug, Clone, PartialEq, Serialize)]
pub struct NewApp {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub description: Option<String>,
    #[builder(default)]
    pub metadata: Record<AnyJson>,
}

/// Response of [`AppService::regenerate_api_key`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RegeneratedKey {
    #[serde(alias = "key")]
    pub api_key: String,
    #[serde(flatten)]
    pub extra: Record<AnyJson>,
}

impl std::fmt::Debug for RegeneratedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegeneratedKey")
            .field("api_key", &"<redacted>")
            .field("extra", &self.extra)
            .finish()
    }
}

/// Application operations.
#[derive(Debug, Clone)]
pub struct AppService {
    api: Arc<ApiClient>,
}

impl AppService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        AppService { api }
    }

    pub async fn create(&self, app: NewApp) -> Result<App> {
        require_not_empty(&app.name, "name")?;

        let body = NewApp {
            metadata: sanitize_metadata(&app.metadata),
            ..app
        };
        self.api.send_data(Method::POST, "/apps", &body).await
    }

    pub async fn get(&self, app_id: &str) -> Result<App> {
        let path = resource_path("/apps", app_id, "app_id")?;
        self.api.get_data(&path, &[]).await
    }

    /// Applies a partial update (`PATCH`).
    pub async fn update(&self, app_id: &str, updates: &Record<AnyJson>) -> Result<App> {
        let path = resource_path("/apps", app_id, "app_id")?;
        self.api
            .send_data(Method::PATCH, &path, &update_body(updates))
            .await
    }

    pub async fn delete(&self, app_id: &str) -> Result<()> {
        let path = resource_path("/apps", app_id, "app_id")?;
        self.api.delete(&path).await?;
        Ok(())
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<App>> {
        self.api.get_json("/apps", &params.query_pairs()).await
    }

    /// Issues a new API key for the application; the old key stops working.
    pub async fn regenerate_api_key(&self, app_id: &str) -> Result<RegeneratedKey> {
        let path = resource_path("/apps", app_id, "app_id")?;
        decode_data(self.api.post(&format!("{path}/regenerate-key"), None).await?)
    }
}

use std::sync::Arc;

use bon::Builder;
use http::Method;
use serde::{Deserialize, Serialize};

use super::{resource_path, update_body};
use crate::{
    client::ApiClient,
    errors::{ApiError, Result},
    types::{AnyJson, ListParams, Page, Record},
    validation::{is_valid_email, require_not_empty, sanitize_metadata},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Record<AnyJson>>,
    #[serde(flatten)]
    pub extra: Record<AnyJson>,
}

/// Input for [`UserService::create`].
#[derive(Builder, Debug, Clone, PartialEq, Serialize)]
pub struct NewUser {
    #[builder(into)]
    pub email: String,
    #[builder(into)]
    pub name: Option<String>,
    #[builder(default)]
    pub metadata: Record<AnyJson>,
}

/// User operations.
#[derive(Debug, Clone)]
pub struct UserService {
    api: Arc<ApiClient>,
}

impl UserService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        UserService { api }
    }

    pub async fn create(&self, user: NewUser) -> Result<User> {
        require_not_empty(&user.email, "email")?;
        if !is_valid_email(&user.email) {
            return Err(ApiError::validation("Invalid email format"));
        }

        let body = NewUser {
            metadata: sanitize_metadata(&user.metadata),
            ..user
        };
        self.api.send_data(Method::POST, "/users", &body).await
    }

    pub async fn get(&self, user_id: &str) -> Result<User> {
        let path = resource_path("/users", user_id, "user_id")?;
        self.api.get_data(&path, &[]).await
    }

    pub async fn update(&self, user_id: &str, updates: &Record<AnyJson>) -> Result<User> {
        let path = resource_path("/users", user_id, "user_id")?;
        self.api
            .send_data(Method::PUT, &path, &update_body(updates))
            .await
    }

    pub async fn delete(&self, user_id: &str) -> Result<()> {
        let path = resource_path("/users", user_id, "user_id")?;
        self.api.delete(&path).await?;
        Ok(())
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<User>> {
        self.api.get_json("/users", &params.query_pairs()).await
    }

    pub async fn stats(&self) -> Result<Record<AnyJson>> {
        self.api.get_data("/users/stats", &[]).await
    }
}

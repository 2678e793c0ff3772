//! HTTP client for the LicenseChain API.
//!
//! [`LicenseChainClient`] owns one service per resource plus the analytics
//! service; every service shares a single [`ApiClient`] request pipeline.

mod api;
mod retry;
mod services;

use std::sync::Arc;

pub use api::{API_PREFIX, API_VERSION, ApiClient, PLATFORM, user_agent};
pub use retry::*;
pub use services::*;

use crate::{config::Configuration, errors::Result, types::AnyJson};

/// Entry point of the SDK.
///
/// ```no_run
/// use licensechain::{client::{LicenseChainClient, NewLicense}, config::Configuration};
///
/// # async fn run() -> licensechain::errors::Result<()> {
/// let client = LicenseChainClient::new(Configuration::new("lc_live_key"))?;
///
/// let license = client
///     .licenses()
///     .create(
///         NewLicense::builder()
///             .user_id("550e8400-e29b-41d4-a716-446655440000")
///             .product_id("6ba7b810-9dad-11d1-80b4-00c04fd430c8")
///             .build(),
///     )
///     .await?;
///
/// println!("created {}", license.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LicenseChainClient {
    api: Arc<ApiClient>,
    apps: AppService,
    licenses: LicenseService,
    users: UserService,
    products: ProductService,
    webhooks: WebhookService,
    analytics: AnalyticsService,
}

impl LicenseChainClient {
    pub fn new(config: Configuration) -> Result<Self> {
        let api = Arc::new(ApiClient::new(config)?);

        Ok(LicenseChainClient {
            apps: AppService::new(api.clone()),
            licenses: LicenseService::new(api.clone()),
            users: UserService::new(api.clone()),
            products: ProductService::new(api.clone()),
            webhooks: WebhookService::new(api.clone()),
            analytics: AnalyticsService::new(api.clone()),
            api,
        })
    }

    pub fn config(&self) -> &Configuration {
        self.api.config()
    }

    /// The shared request pipeline, for endpoints without a typed service.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn apps(&self) -> &AppService {
        &self.apps
    }

    pub fn licenses(&self) -> &LicenseService {
        &self.licenses
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn products(&self) -> &ProductService {
        &self.products
    }

    pub fn webhooks(&self) -> &WebhookService {
        &self.webhooks
    }

    pub fn analytics(&self) -> &AnalyticsService {
        &self.analytics
    }

    pub async fn ping(&self) -> Result<AnyJson> {
        self.api.get("/ping", &[]).await
    }

    pub async fn health(&self) -> Result<AnyJson> {
        self.api.get("/health", &[]).await
    }

    /// Service status as reported by `GET /status`.
    pub async fn status(&self) -> Result<AnyJson> {
        self.api.get("/status", &[]).await
    }
}

use std::sync::Arc;

use bon::Builder;
use http::Method;
use serde::{Deserialize, Serialize};

use super::{resource_path, update_body};
use crate::{
    client::ApiClient,
    errors::{ApiError, Result},
    types::{AnyJson, ListParams, Page, Record},
    validation::{is_valid_currency, require_not_empty, require_positive, sanitize_metadata},
};

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Record<AnyJson>>,
    #[serde(flatten)]
    pub extra: Record<AnyJson>,
}

/// Input for [`ProductService::create`].
///
/// ```
/// use licensechain::client::NewProduct;
///
/// let product = NewProduct::builder().name("Pro plan").price(49.0).build();
/// assert_eq!(product.currency, "USD");
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub description: Option<String>,
    pub price: Option<f64>,
    #[builder(into, default = DEFAULT_CURRENCY.to_string())]
    pub currency: String,
    #[builder(default)]
    pub metadata: Record<AnyJson>,
}

/// Product operations.
#[derive(Debug, Clone)]
pub struct ProductService {
    api: Arc<ApiClient>,
}

impl ProductService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        ProductService { api }
    }

    pub async fn create(&self, product: NewProduct) -> Result<Product> {
        require_not_empty(&product.name, "name")?;
        if let Some(price) = product.price {
            require_positive(price, "price")?;
        }
        if !is_valid_currency(&product.currency) {
            return Err(ApiError::validation(format!(
                "Invalid currency: {}",
                product.currency
            )));
        }

        let body = NewProduct {
            currency: product.currency.to_ascii_uppercase(),
            metadata: sanitize_metadata(&product.metadata),
            ..product
        };
        self.api.send_data(Method::POST, "/products", &body).await
    }

    pub async fn get(&self, product_id: &str) -> Result<Product> {
        let path = resource_path("/products", product_id, "product_id")?;
        self.api.get_data(&path, &[]).await
    }

    pub async fn update(&self, product_id: &str, updates: &Record<AnyJson>) -> Result<Product> {
        let path = resource_path("/products", product_id, "product_id")?;
        self.api
            .send_data(Method::PUT, &path, &update_body(updates))
            .await
    }

    pub async fn delete(&self, product_id: &str) -> Result<()> {
        let path = resource_path("/products", product_id, "product_id")?;
        self.api.delete(&path).await?;
        Ok(())
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<Product>> {
        self.api.get_json("/products", &params.query_pairs()).await
    }

    pub async fn stats(&self) -> Result<Record<AnyJson>> {
        self.api.get_data("/products/stats", &[]).await
    }
}

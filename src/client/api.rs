use http::{
    HeaderMap, HeaderName, HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    client::RetryPolicy,
    config::Configuration,
    errors::{ApiError, Result},
    types::{AnyJson, Envelope},
};

/// Path prefix of the versioned API.
pub const API_PREFIX: &str = "/v1";

/// Value of the `X-API-Version` header.
pub const API_VERSION: &str = "1.0";

/// Value of the `X-Platform` header.
pub const PLATFORM: &str = "rust-sdk";

const X_API_VERSION: HeaderName = HeaderName::from_static("x-api-version");
const X_PLATFORM: HeaderName = HeaderName::from_static("x-platform");

/// `User-Agent` sent with every request.
pub fn user_agent() -> String {
    format!("licensechain-rust-sdk/{}", env!("CARGO_PKG_VERSION"))
}

/// The request pipeline: URL building, fixed headers, retries and response
/// classification.
///
/// Shared by every resource service behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Configuration,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Validates `config` and builds the underlying HTTP client.
    pub fn new(config: Configuration) -> Result<Self> {
        config.validate()?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ApiError::validation("API key contains invalid header characters"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(X_API_VERSION, HeaderValue::from_static(API_VERSION));
        headers.insert(X_PLATFORM, HeaderValue::from_static(PLATFORM));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to build HTTP client: {e}")))?;

        Ok(ApiClient {
            retry: RetryPolicy::from_config(&config),
            config,
            client,
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Builds the target URL: base URL, `/v1` prefix, path, then query pairs.
    ///
    /// Paths already starting with the version prefix are not prefixed again.
    pub fn build_url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let path = format!("/{}", path.trim_start_matches('/'));
        let versioned = if path == API_PREFIX || path.starts_with(&format!("{API_PREFIX}/")) {
            path
        } else {
            format!("{API_PREFIX}{path}")
        };

        let mut url = Url::parse(&format!("{}{versioned}", self.config.base_url()))
            .map_err(|e| ApiError::validation(format!("Invalid request path '{versioned}': {e}")))?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// Sends one logical request, retrying network failures, 429 and 5xx.
    ///
    /// Other 4xx responses fail immediately. Retry `n` waits
    /// `retry_delay * 2^(n-1)`. Exhausted network failures surface as
    /// [`ApiError::Network`]; exhausted 429/5xx surface as their classified error.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&AnyJson>,
        query: &[(String, String)],
    ) -> Result<AnyJson> {
        let url = self.build_url(path, query)?;
        let max_attempts = self.retry.max_attempts();
        let mut last_error: Option<ApiError> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.retry.delay_for(attempt - 1);

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Retrying {method} {path} in {delay:?} (attempt {attempt}/{max_attempts}): {}",
                    last_error.as_ref().map(ToString::to_string).unwrap_or_default()
                );

                tokio::time::sleep(delay).await;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!("Sending {method} {path} (attempt {attempt}/{max_attempts})");

            match self.send_once(method.clone(), url.clone(), body).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => last_error = Some(err),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("{method} {path} failed without retry: {err}");

                    return Err(err);
                }
            }
        }

        match last_error {
            Some(ApiError::Network(last)) => {
                let mut err = ApiError::network("Maximum retry attempts exceeded");
                let details = err.error_details_mut();
                details
                    .details
                    .insert("last_error".to_string(), AnyJson::from(last.message));
                details
                    .details
                    .insert("attempts".to_string(), AnyJson::from(max_attempts));
                Err(err)
            }
            Some(err) => Err(err),
            None => Err(ApiError::network("Maximum retry attempts exceeded")),
        }
    }

    async fn send_once(&self, method: Method, url: Url, body: Option<&AnyJson>) -> Result<AnyJson> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let text = response.text().await.map_err(transport_error)?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(AnyJson::Object(Default::default()));
            }
            return serde_json::from_str(&text).map_err(|e| {
                let mut err = ApiError::unknown(format!("Invalid JSON response: {e}"));
                err.error_details_mut().status_code = Some(status.as_u16());
                err
            });
        }

        let body = match serde_json::from_str::<AnyJson>(&text) {
            Ok(body) => body,
            Err(_) if text.trim().is_empty() => AnyJson::Null,
            Err(_) => AnyJson::String(text),
        };

        let mut err = ApiError::from_response(status.as_u16(), &body);
        if let ApiError::RateLimit { info, .. } = &mut err {
            info.retry_after = info.retry_after.or(retry_after);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Response classified: status={}, kind={:?}", status.as_u16(), err.kind());

        Err(err)
    }

    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<AnyJson> {
        self.execute(Method::GET, path, None, query).await
    }

    pub async fn post(&self, path: &str, body: Option<&AnyJson>) -> Result<AnyJson> {
        self.execute(Method::POST, path, body, &[]).await
    }

    pub async fn put(&self, path: &str, body: Option<&AnyJson>) -> Result<AnyJson> {
        self.execute(Method::PUT, path, body, &[]).await
    }

    pub async fn patch(&self, path: &str, body: Option<&AnyJson>) -> Result<AnyJson> {
        self.execute(Method::PATCH, path, body, &[]).await
    }

    pub async fn delete(&self, path: &str) -> Result<AnyJson> {
        self.execute(Method::DELETE, path, None, &[]).await
    }

    /// `GET` decoding the `data` envelope into `T`.
    pub(crate) async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        decode_data(self.get(path, query).await?)
    }

    /// `GET` decoding the whole response into `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        decode(self.get(path, query).await?)
    }

    /// Sends `body` with `method`, decoding the `data` envelope into `T`.
    pub(crate) async fn send_data<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = encode(body)?;
        decode_data(self.execute(method, path, Some(&body), &[]).await?)
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::network(format!("Request timed out: {err}"))
    } else {
        ApiError::network(format!("Request failed: {err}"))
    }
}

pub(crate) fn encode<B: Serialize>(body: &B) -> Result<AnyJson> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::validation(format!("Failed to serialize request body: {e}")))
}

pub(crate) fn decode<T: DeserializeOwned>(value: AnyJson) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::unknown(format!("Unexpected response shape: {e}")))
}

/// Unwraps `{"data": ...}` when present; otherwise decodes the whole body.
pub(crate) fn decode_data<T: DeserializeOwned>(value: AnyJson) -> Result<T> {
    if value.as_object().is_some_and(|map| map.contains_key("data")) {
        decode::<Envelope<T>>(value).map(|envelope| envelope.data)
    } else {
        decode(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(Configuration::new("key").with_base_url(base_url)).unwrap()
    }

    #[test]
    fn test_build_url_adds_version_prefix_once() {
        let client = client("https://api.licensechain.app/");

        assert_eq!(
            client.build_url("/licenses", &[]).unwrap().as_str(),
            "https://api.licensechain.app/v1/licenses"
        );
        assert_eq!(
            client.build_url("licenses/stats", &[]).unwrap().as_str(),
            "https://api.licensechain.app/v1/licenses/stats"
        );
        assert_eq!(
            client.build_url("/v1/health", &[]).unwrap().as_str(),
            "https://api.licensechain.app/v1/health"
        );
    }

    #[test]
    fn test_build_url_appends_query() {
        let client = client("http://localhost:8080");
        let url = client
            .build_url(
                "/users",
                &[
                    ("page".to_string(), "2".to_string()),
                    ("q".to_string(), "a b".to_string()),
                ],
            )
            .unwrap();

        assert_eq!(url.as_str(), "http://localhost:8080/v1/users?page=2&q=a+b");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ApiClient::new(Configuration::new("")).unwrap_err();
        assert_eq!(err.message(), "API key is required");

        let err = ApiClient::new(Configuration::new("bad\nkey")).unwrap_err();
        assert_eq!(err.message(), "API key contains invalid header characters");
    }

    #[test]
    fn test_decode_data_unwraps_envelope() {
        let value: String = decode_data(json!({"data": "x", "meta": 1})).unwrap();
        assert_eq!(value, "x");

        let bare: Validity = decode_data(json!({"valid": true})).unwrap();
        assert!(bare.valid);

        let empty: Option<String> = decode_data(json!({"data": null})).unwrap();
        assert_eq!(empty, None);

        let err = decode_data::<Validity>(json!({"data": 5})).unwrap_err();
        assert!(err.message().starts_with("Unexpected response shape"));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Validity {
        valid: bool,
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(user_agent().starts_with("licensechain-rust-sdk/"));
        assert!(user_agent().ends_with(env!("CARGO_PKG_VERSION")));
    }
}

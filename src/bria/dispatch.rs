use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;

use crate::{
    config::StudioConfig,
    error::{Result, StudioError},
    models::{GenerationRequest, JobSet, ResultSet},
};

/// Sends an assembled request to the image service and returns its raw
/// JSON answer.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: &GenerationRequest) -> Result<Value>;
}

/// What a submission produced before any polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed(ResultSet),
    /// Asynchronous results still being rendered. `results` keeps every
    /// reference in the order the service listed them; inline images are
    /// already complete, URLs only once their job is ready.
    Pending { jobs: JobSet, results: ResultSet },
}

pub struct HttpDispatcher {
    client: Client,
    config: StudioConfig,
    headers: HeaderMap,
}

impl HttpDispatcher {
    pub fn new(config: StudioConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| StudioError::ConfigError("BRIA API key is required".into()))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StudioError::ConfigError(format!("HTTP client: {}", e)))?;

        let headers = build_headers(api_key)?;
        Ok(Self {
            client,
            config,
            headers,
        })
    }
}

fn build_headers(api_key: &str) -> Result<HeaderMap> {
    let mut token = HeaderValue::from_str(api_key)
        .map_err(|_| StudioError::ConfigError("API key is not a valid header value".into()))?;
    token.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert("api_token", token);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, request: &GenerationRequest) -> Result<Value> {
        let url = self.config.endpoint(request.kind().endpoint());
        log::debug!("POST {} ({})", url, request.kind());

        let response = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(&request.payload())
            .send()
            .await
            .map_err(|e| {
                StudioError::RequestError(format!("{} request failed: {}", request.kind(), e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StudioError::RequestError(format!("reading response: {}", e)))?;

        if !status.is_success() {
            log::warn!("{} answered HTTP {}", request.kind(), status.as_u16());
            return Err(StudioError::ResponseError {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| StudioError::malformed(format!("response is not JSON: {}", e)))
    }
}

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::error::{Result, StudioError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Ready,
    NotReady,
    /// The reference is not a probeable URL and can never become ready.
    Rejected,
}

/// Existence check for a pending job reference.
///
/// `Err` is always treated as transient by the poller.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self, reference: &str) -> Result<ProbeStatus>;
}

/// HEAD request against the reference URL; ready on HTTP 200.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StudioError::ConfigError(format!("probe client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn probe(&self, reference: &str) -> Result<ProbeStatus> {
        let url = match reqwest::Url::parse(reference) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                log::warn!("Cannot probe non-HTTP reference: {}", reference);
                return Ok(ProbeStatus::Rejected);
            }
        };

        let send = self.client.head(url).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| {
                StudioError::ProbeTransientFailure(format!(
                    "probe timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| StudioError::ProbeTransientFailure(e.to_string()))?;

        let status = response.status();
        log::trace!("Probe {} -> {}", reference, status);
        Ok(if status == StatusCode::OK {
            ProbeStatus::Ready
        } else {
            ProbeStatus::NotReady
        })
    }
}

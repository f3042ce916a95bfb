use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// Absorbed by the poller as "not ready yet"; never returned from a poll.
    #[error("Probe failed: {0}")]
    ProbeTransientFailure(String),
    #[error("Polling budget exhausted with {pending} job(s) still pending")]
    PollingExpired { pending: usize },
    #[error("All {0} job(s) were rejected by the service")]
    JobsFailed(usize),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: HTTP {status} - {body}")]
    ResponseError { status: u16, body: String },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Image error: {0}")]
    ImageError(String),
}

impl StudioError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StudioError::InvalidParameter(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        StudioError::MalformedResponse(msg.into())
    }

    /// The service answers 422 when content moderation rejects an input.
    pub fn is_content_moderation(&self) -> bool {
        matches!(self, StudioError::ResponseError { status: 422, .. })
    }

    /// "Not ready yet, try later" rather than an application failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StudioError::PollingExpired { .. })
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::SerializationError(e.to_string())
    }
}

impl From<image::ImageError> for StudioError {
    fn from(e: image::ImageError) -> Self {
        StudioError::ImageError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

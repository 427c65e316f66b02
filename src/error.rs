use std::time::Duration;

/// Failure of a single backend call, as classified by the request adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("Backend address is not configured. Set API_BASE_URL to the ResQ-Her backend.")]
    MissingConfiguration,

    #[error("Backend unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Backend responded with status {0}")]
    BadStatus(u16),

    #[error("Malformed response payload: {0}")]
    MalformedPayload(String),
}

impl AdapterError {
    /// Whether a retry could plausibly succeed without user or operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::NetworkUnreachable(_) => true,
            AdapterError::BadStatus(code) => *code >= 500,
            AdapterError::MissingConfiguration | AdapterError::MalformedPayload(_) => false,
        }
    }

    pub(crate) fn timed_out(after: Duration) -> Self {
        AdapterError::NetworkUnreachable(format!("request timed out after {after:?}"))
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return AdapterError::BadStatus(status.as_u16());
        }
        if err.is_decode() {
            return AdapterError::MalformedPayload(err.to_string());
        }
        AdapterError::NetworkUnreachable(err.to_string())
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::MalformedPayload(err.to_string())
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Invalid value in the environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    ZeroDuration { key: &'static str },
}

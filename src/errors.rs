use serde::Deserialize;

/// Error body returned by the analysis service on non-success responses.
///
/// The service answers `{"detail": "..."}`; validation failures carry a list
/// instead of a string, so `detail` is kept as raw JSON.
#[derive(Debug, Deserialize)]
pub struct ServiceErrorBody {
    pub detail: serde_json::Value,
}

impl ServiceErrorBody {
    /// Flatten `detail` into a single log-friendly line.
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Message shown to the user whenever conditions could not be fetched.
pub const FETCH_FAILED_MESSAGE: &str =
    "Could not fetch conditions. Check your connection and try again.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether a manual retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::ExternalServiceError(_)
        )
    }

    /// Human-readable message for the error state.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) | AppError::ExternalServiceError(_) => {
                FETCH_FAILED_MESSAGE.to_string()
            }
            AppError::Storage(msg) => format!("Local storage unavailable: {}", msg),
            AppError::Serialization(_) => FETCH_FAILED_MESSAGE.to_string(),
            AppError::Config(msg) | AppError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Network(format!("request timed out: {}", err))
        } else if err.is_connect() || err.is_request() {
            AppError::Network(format!("connection failed: {}", err))
        } else if err.is_decode() {
            AppError::ExternalServiceError(format!("response decode error: {}", err))
        } else {
            AppError::ExternalServiceError(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

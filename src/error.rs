use reqwest::StatusCode;
use thiserror::Error;

/// All different error types this crate uses.
#[derive(Error, Debug)]
pub enum CatfreqError {
    /// Received a non success Http response.
    #[error("Expected a 2xx Success but got: {status}")]
    NoHttpSuccess {
        /// The status code of the response.
        status: StatusCode,
    },
    /// Failed to get a response.
    #[error("Request failed: {0}")]
    HttpRequestFailure(#[from] reqwest::Error),
    /// The api answered with a body of unexpected shape.
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// What was missing or invalid.
        reason: String,
    },
    /// Failed to read or write a cache file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to (de)serialize a cache payload.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The category name can't be used.
    #[error("Invalid category: {0:?}")]
    InvalidCategory(String),
}

impl CatfreqError {
    pub(crate) fn malformed<T: ToString>(reason: T) -> Self {
        CatfreqError::MalformedResponse {
            reason: reason.to_string(),
        }
    }

    /// Whether another attempt of the same request may succeed.
    ///
    /// Transport failures, server errors, throttling and malformed bodies are
    /// transient; client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CatfreqError::NoHttpSuccess { status } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            CatfreqError::HttpRequestFailure(_) | CatfreqError::MalformedResponse { .. } => true,
            CatfreqError::Io(_) | CatfreqError::Serialization(_) => false,
            CatfreqError::InvalidCategory(_) => false,
        }
    }
}

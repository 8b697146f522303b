use thiserror::Error;

/// Failure of a call to the referral API.
///
/// Every non-2xx status is treated the same way; the status code is kept
/// only for the message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP {status}")]
    Http { status: u16, url: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Used by in-memory collaborators to simulate a network failure
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClimateError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClimateError {
    /// Upstream URLs carry API keys in the query string; never let them reach a log line.
    fn from(e: reqwest::Error) -> Self {
        ClimateError::RequestFailed(e.without_url())
    }
}

pub type ClimateResult<T> = Result<T, ClimateError>;

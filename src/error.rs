//! Errors raised at the content source boundary

use reqwest::StatusCode;

/// Failure talking to the headless CMS or decoding its answer
#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error {0} (url: {1})")]
    Status(StatusCode, String),

    #[error("malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("repository at {0} has no master ref")]
    NoMasterRef(String),

    #[error("invalid url {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
}

impl CmsError {
    /// Whether the content source reported the document as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, CmsError::Status(status, _) if *status == StatusCode::NOT_FOUND)
    }
}

pub type CmsResult<T> = std::result::Result<T, CmsError>;

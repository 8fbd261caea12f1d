use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("normalization error for product {source_product_id}: {reason}")]
    Normalization {
        source_product_id: String,
        reason: String,
    },

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: usize },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid item pattern \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("run cancelled before request was issued")]
    Cancelled,
}

impl ScraperError {
    /// Returns `true` for failures worth retrying after a back-off delay.
    ///
    /// Rate limits, timeouts, network failures, and 5xx responses are
    /// transient. Not-found, 4xx, parse, and normalization errors are not:
    /// retrying returns the same result.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::RateLimited { .. } | ScraperError::Timeout { .. } => true,
            ScraperError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ScraperError::UnexpectedStatus { status, .. } => (500..600).contains(status),
            ScraperError::Deserialize { .. }
            | ScraperError::NotFound { .. }
            | ScraperError::Normalization { .. }
            | ScraperError::PaginationLimit { .. }
            | ScraperError::InvalidUrl { .. }
            | ScraperError::InvalidPattern { .. }
            | ScraperError::Cancelled => false,
        }
    }
}

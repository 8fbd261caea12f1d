//! Rate-limited HTTP fetching shared by every adapter.
//!
//! [`HttpFetcher`] issues single requests: random pre-request jitter, a
//! rotated `User-Agent`, typed errors for 429/404/non-2xx, and retries via
//! [`crate::rate_limit::with_retry`]. [`RateLimitedFetcher`] wraps it with
//! per-run AIMD concurrency control over batches of requests.

mod aimd;

use std::time::Duration;

use rand::seq::IndexedRandom;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;
use crate::origin::extract_domain;
use crate::rate_limit::{fetch_backoff, random_below, with_retry};

pub use aimd::{BatchReport, BatchVerdict, RateLimitState, RateLimitedFetcher};

/// Browser `User-Agent` strings rotated per request.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

/// Tuning for a fetcher instance.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Starting batch size, also the ceiling for additive increase.
    pub initial_concurrency: usize,
    /// Floor for the decrease step.
    pub min_concurrency: usize,
    /// Extra sleep after a batch where more than half the requests failed.
    pub penalty_delay: Duration,
    pub request_timeout: Duration,
    /// Retries after the first failure of a single request.
    pub max_retries: u32,
    /// Upper bound of the random delay before each request.
    pub jitter_max: Duration,
    /// Back-off unit; retry `n` waits `unit * 2^(n+1)` plus jitter.
    pub backoff_unit: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            initial_concurrency: 5,
            min_concurrency: 2,
            penalty_delay: Duration::from_secs(3),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            jitter_max: Duration::from_millis(400),
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl FetchPolicy {
    #[must_use]
    pub fn from_app_config(config: &shopdb_core::AppConfig) -> Self {
        Self {
            initial_concurrency: config.scraper_initial_concurrency,
            min_concurrency: config.scraper_min_concurrency,
            penalty_delay: Duration::from_millis(config.scraper_penalty_delay_ms),
            request_timeout: Duration::from_secs(config.scraper_request_timeout_secs),
            max_retries: config.scraper_max_retries,
            jitter_max: Duration::from_millis(config.scraper_jitter_max_ms),
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// A fetched response body with the metadata adapters need.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Single-request HTTP client. Cheap to clone; clones share the connection
/// pool and the cancellation token.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: FetchPolicy,
    cancel: CancellationToken,
}

impl HttpFetcher {
    /// Builds the underlying `reqwest::Client` with the policy's timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be constructed
    /// (e.g., invalid TLS config).
    pub fn new(policy: FetchPolicy, cancel: CancellationToken) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(policy.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            policy,
            cancel,
        })
    }

    #[must_use]
    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Whether the run has been cancelled. Loops check this between batches
    /// or pages; in-flight requests are never interrupted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fetches `url` with jitter, a rotated `User-Agent`, and retry on
    /// transient failures.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries exhausted.
    /// - [`ScraperError::Timeout`]: request timed out after all retries.
    /// - [`ScraperError::NotFound`]: HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`]: other non-2xx status (5xx retried).
    /// - [`ScraperError::Http`]: network or TLS failure.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<FetchedPage, ScraperError> {
        let unit = self.policy.backoff_unit;
        with_retry(
            self.policy.max_retries,
            |attempt, err| fetch_backoff(attempt, err, unit),
            || self.fetch_once(url, headers),
        )
        .await
    }

    async fn fetch_once(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<FetchedPage, ScraperError> {
        let jitter = random_below(self.policy.jitter_max);
        if !jitter.is_zero() {
            tokio::time::sleep(jitter).await;
        }

        let user_agent = pick_user_agent();
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .header(
                reqwest::header::ACCEPT,
                "application/json,text/html;q=0.9,application/xml;q=0.8,*/*;q=0.7",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| classify(e, url))?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);
            return Err(ScraperError::RateLimited {
                domain: extract_domain(url),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.map_err(|e| classify(e, url))?;

        Ok(FetchedPage {
            url: url.to_owned(),
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    /// Fetches `url` and deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::fetch`], or [`ScraperError::Deserialize`] when
    /// the body is not the expected JSON shape.
    pub async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, ScraperError> {
        let page = self.fetch(url, &[]).await?;
        serde_json::from_str::<T>(&page.body).map_err(|e| ScraperError::Deserialize {
            context: url.to_owned(),
            source: e,
        })
    }
}

fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Maps reqwest timeouts onto [`ScraperError::Timeout`] so they are handled
/// like any other failed request.
fn classify(err: reqwest::Error, url: &str) -> ScraperError {
    if err.is_timeout() {
        ScraperError::Timeout {
            url: url.to_owned(),
        }
    } else {
        ScraperError::Http(err)
    }
}

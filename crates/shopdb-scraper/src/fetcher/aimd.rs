//! Additive-increase / multiplicative-decrease batch concurrency.
//!
//! Requests go out in batches of `concurrency`. After each batch the
//! transient-failure rate decides the next batch size:
//!
//! - more than half failed: shrink by one (floor `min_concurrency`), count a
//!   consecutive error, and sleep the penalty delay before continuing
//! - none failed: grow by one up to the initial value, but only when no
//!   degraded batch preceded this one; then reset the consecutive count
//! - otherwise hold
//!
//! State is per run: every source starts from the initial concurrency.

use futures::future::{join_all, BoxFuture};

use super::{FetchPolicy, HttpFetcher};
use crate::error::ScraperError;

/// What [`RateLimitState::record_batch`] did to the concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchVerdict {
    Increase,
    Decrease,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitState {
    concurrency: usize,
    consecutive_errors: u32,
}

impl RateLimitState {
    #[must_use]
    pub fn new(policy: &FetchPolicy) -> Self {
        Self {
            concurrency: policy.initial_concurrency.max(1),
            consecutive_errors: 0,
        }
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Applies the outcome of one batch. `failed` counts transient failures
    /// only.
    pub fn record_batch(
        &mut self,
        failed: usize,
        total: usize,
        policy: &FetchPolicy,
    ) -> BatchVerdict {
        if total == 0 {
            return BatchVerdict::Hold;
        }

        if failed * 2 > total {
            self.consecutive_errors = self.consecutive_errors.saturating_add(1);
            let floor = policy.min_concurrency.max(1);
            self.concurrency = self.concurrency.saturating_sub(1).max(floor);
            return BatchVerdict::Decrease;
        }

        if failed == 0 {
            let ceiling = policy.initial_concurrency.max(1);
            let grow = self.consecutive_errors == 0 && self.concurrency < ceiling;
            self.consecutive_errors = 0;
            if grow {
                self.concurrency += 1;
                return BatchVerdict::Increase;
            }
        }

        BatchVerdict::Hold
    }
}

/// Results of [`RateLimitedFetcher::fetch_batched`], in input order.
///
/// Items not attempted because the run was cancelled are counted in
/// `skipped` and have no entry in `results`.
#[derive(Debug)]
pub struct BatchReport<R> {
    pub results: Vec<Result<R, ScraperError>>,
    pub skipped: usize,
}

impl<R> BatchReport<R> {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }
}

/// An [`HttpFetcher`] paired with per-run AIMD state.
pub struct RateLimitedFetcher {
    http: HttpFetcher,
    state: RateLimitState,
    policy: FetchPolicy,
}

impl RateLimitedFetcher {
    #[must_use]
    pub fn new(http: HttpFetcher) -> Self {
        let policy = http.policy().clone();
        Self {
            state: RateLimitState::new(&policy),
            http,
            policy,
        }
    }

    #[must_use]
    pub fn http(&self) -> &HttpFetcher {
        &self.http
    }

    #[must_use]
    pub fn state(&self) -> &RateLimitState {
        &self.state
    }

    /// Runs `op` over every item in concurrency-sized batches, adapting the
    /// batch size after each one. Individual failures are kept in the
    /// report; they never abort the remaining batches.
    ///
    /// Cancellation is checked before each batch. Once observed, the rest of
    /// the items are skipped; a batch already in flight always completes.
    pub async fn fetch_batched<'a, T, R, F>(
        &'a mut self,
        items: &'a [T],
        op: F,
    ) -> BatchReport<R>
    where
        T: Sync,
        R: Send + 'a,
        F: Fn(&'a HttpFetcher, &'a T) -> BoxFuture<'a, Result<R, ScraperError>>,
    {
        let Self {
            http,
            state,
            policy,
        } = self;
        let http: &'a HttpFetcher = http;

        let mut results = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        let mut start = 0usize;

        while start < items.len() {
            if http.is_cancelled() {
                skipped = items.len() - start;
                tracing::info!(skipped, "cancellation requested; not starting further batches");
                break;
            }

            let end = (start + state.concurrency()).min(items.len());
            let batch = &items[start..end];
            let outcomes = join_all(batch.iter().map(|item| op(http, item))).await;

            let failed = outcomes
                .iter()
                .filter(|r| r.as_ref().is_err_and(ScraperError::is_transient))
                .count();
            let verdict = state.record_batch(failed, batch.len(), policy);

            match verdict {
                BatchVerdict::Decrease => {
                    tracing::warn!(
                        failed,
                        total = batch.len(),
                        concurrency = state.concurrency(),
                        consecutive_errors = state.consecutive_errors(),
                        "batch degraded; reducing concurrency"
                    );
                    if !policy.penalty_delay.is_zero() {
                        tokio::time::sleep(policy.penalty_delay).await;
                    }
                }
                BatchVerdict::Increase => {
                    tracing::debug!(
                        concurrency = state.concurrency(),
                        "batch clean; increasing concurrency"
                    );
                }
                BatchVerdict::Hold => {}
            }

            results.extend(outcomes);
            start = end;
        }

        BatchReport { results, skipped }
    }
}

#[cfg(test)]
#[path = "aimd_test.rs"]
mod tests;

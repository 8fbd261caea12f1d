//! Runs requested sources one after another and aggregates their results.
//!
//! Each source gets its own [`RateLimitedFetcher`] so AIMD state never
//! carries over between sources. Failures stay inside the source that
//! produced them: item errors become strings on that source's
//! [`ScraperResult`], and a failed or panicking source is recorded and
//! skipped.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use shopdb_core::{NormalizedProduct, ScraperResult};

use crate::adapter::Adapter;
use crate::error::ScraperError;
use crate::fetcher::{HttpFetcher, RateLimitedFetcher};
use crate::registry::SourceRegistry;

/// Everything a run produced, one [`ScraperResult`] per source attempted.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub per_source: Vec<ScraperResult>,
    /// Requested names with no registered adapter.
    pub unknown_sources: Vec<String>,
    /// Requested sources not started because the run was cancelled.
    pub not_started: Vec<String>,
}

impl RunOutcome {
    /// Products from every source, concatenated in run order. Cross-source
    /// duplicates are left for the importer.
    #[must_use]
    pub fn products(&self) -> Vec<&NormalizedProduct> {
        self.per_source.iter().flat_map(|r| r.products.iter()).collect()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.per_source.iter().map(|r| r.errors.len()).sum()
    }
}

pub struct Orchestrator<'r> {
    registry: &'r SourceRegistry,
    http: HttpFetcher,
}

impl<'r> Orchestrator<'r> {
    #[must_use]
    pub fn new(registry: &'r SourceRegistry, http: HttpFetcher) -> Self {
        Self { registry, http }
    }

    /// Scrapes each named source in order, at most `max_items` per source.
    ///
    /// Never fails: unknown names are logged and skipped, and once the
    /// run is cancelled the remaining sources are not started.
    pub async fn run(&self, sources: &[String], max_items: usize) -> RunOutcome {
        let mut outcome = RunOutcome::default();

        for (index, name) in sources.iter().enumerate() {
            if self.http.is_cancelled() {
                tracing::warn!(
                    remaining = sources.len() - index,
                    "run cancelled; not starting remaining sources"
                );
                outcome.not_started.extend(sources[index..].iter().cloned());
                break;
            }

            let Some(adapter) = self.registry.get(name) else {
                tracing::warn!(source = %name, "unknown source; skipping");
                outcome.unknown_sources.push(name.clone());
                continue;
            };

            tracing::info!(source = %name, max_items, "scraping source");
            let started = Instant::now();

            let result = match AssertUnwindSafe(self.run_source(adapter, max_items))
                .catch_unwind()
                .await
            {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    tracing::error!(source = %name, error = %e, "source failed");
                    ScraperResult::failed(name.as_str(), e.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(source = %name, panic = %message, "adapter panicked");
                    ScraperResult::failed(name.as_str(), format!("adapter panicked: {message}"))
                }
            };

            tracing::info!(
                source = %name,
                products = result.product_count(),
                errors = result.errors.len(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "source finished"
            );
            outcome.per_source.push(result);
        }

        outcome
    }

    async fn run_source(
        &self,
        adapter: &dyn Adapter,
        max_items: usize,
    ) -> Result<ScraperResult, ScraperError> {
        let name = adapter.name();
        let mut fetcher = RateLimitedFetcher::new(self.http.clone());

        let mut items = adapter.discover(fetcher.http(), max_items).await?;
        items.truncate(max_items);
        tracing::info!(source = %name, items = items.len(), "discovery complete");

        let mut result = ScraperResult::new(name);
        if items.is_empty() {
            return Ok(result);
        }

        let report = fetcher
            .fetch_batched(&items, |http, item| adapter.fetch_detail(http, item))
            .await;

        let mut dropped = 0usize;
        let mut missing = 0usize;
        for (item, outcome) in items.iter().zip(report.results) {
            match outcome {
                Ok(Some(payload)) => match adapter.normalize(payload) {
                    Some(product) => result.products.push(product),
                    None => {
                        tracing::debug!(
                            source = %name,
                            handle = %item.handle,
                            "item dropped by normalizer"
                        );
                        dropped += 1;
                    }
                },
                Ok(None) => missing += 1,
                Err(e) => {
                    tracing::warn!(source = %name, url = %item.url, error = %e, "item failed");
                    result.errors.push(format!("{}: {e}", item.url));
                }
            }
        }

        if report.skipped > 0 {
            result
                .errors
                .push(format!("run cancelled; {} items not fetched", report.skipped));
        }

        tracing::debug!(
            source = %name,
            dropped,
            missing,
            final_concurrency = fetcher.state().concurrency(),
            "detail fetch complete"
        );
        Ok(result)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;

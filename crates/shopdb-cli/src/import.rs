//! De-duplication and batched upsert of scraped products.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use shopdb_core::{NormalizedProduct, ProductStore, UpsertAction, UpsertOutcome};
use shopdb_scraper::rate_limit::{backoff_delay, with_retry};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Upserts issued concurrently per batch.
    pub batch_size: usize,
    /// Log progress each time this many more products have been processed.
    pub progress_every: usize,
    /// Retries for an upsert the store reports as transient.
    pub max_retries: u32,
    pub retry_unit: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            progress_every: 100,
            max_retries: 2,
            retry_unit: Duration::from_millis(250),
        }
    }
}

impl ImportOptions {
    #[must_use]
    pub fn from_app_config(config: &shopdb_core::AppConfig) -> Self {
        Self {
            batch_size: config.import_batch_size,
            progress_every: config.import_progress_every,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
    /// Inputs collapsed onto an earlier product with the same `source_url`.
    pub duplicates: usize,
    /// Unique products not attempted because the run was cancelled.
    pub skipped: usize,
}

/// Keeps the first product seen for each `source_url`, preserving order.
///
/// Returns the survivors and how many inputs were dropped.
pub fn dedup_by_source_url<'p>(
    products: impl IntoIterator<Item = &'p NormalizedProduct>,
) -> (Vec<&'p NormalizedProduct>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut duplicates = 0usize;

    for product in products {
        if seen.insert(product.source_url.as_str()) {
            unique.push(product);
        } else {
            tracing::debug!(source_url = %product.source_url, "duplicate product dropped");
            duplicates += 1;
        }
    }

    (unique, duplicates)
}

pub struct Importer<'s, S> {
    store: &'s S,
    options: ImportOptions,
    cancel: CancellationToken,
}

impl<'s, S: ProductStore> Importer<'s, S> {
    #[must_use]
    pub fn new(store: &'s S, options: ImportOptions, cancel: CancellationToken) -> Self {
        Self {
            store,
            options,
            cancel,
        }
    }

    /// De-duplicates `products`, then upserts them in fixed-size batches.
    ///
    /// Every upsert in a batch settles before the next batch starts. A
    /// failed upsert is counted and logged; it never stops the import.
    /// Cancellation is checked between batches only.
    pub async fn import<'p>(
        &self,
        products: impl IntoIterator<Item = &'p NormalizedProduct>,
    ) -> ImportSummary {
        let (unique, duplicates) = dedup_by_source_url(products);
        let mut summary = ImportSummary {
            duplicates,
            ..ImportSummary::default()
        };
        let total = unique.len();
        let progress_every = self.options.progress_every.max(1);
        let mut next_progress = progress_every;
        let mut processed = 0usize;

        tracing::info!(total, duplicates, "importing products");

        for batch in unique.chunks(self.options.batch_size.max(1)) {
            if self.cancel.is_cancelled() {
                summary.skipped = total - processed;
                tracing::warn!(
                    skipped = summary.skipped,
                    "import cancelled; remaining batches skipped"
                );
                break;
            }

            let outcomes = join_all(batch.iter().map(|product| self.upsert_one(product))).await;
            for (product, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(UpsertOutcome {
                        action: UpsertAction::Inserted,
                        ..
                    }) => summary.inserted += 1,
                    Ok(UpsertOutcome {
                        action: UpsertAction::Updated,
                        ..
                    }) => summary.updated += 1,
                    Err(e) => {
                        tracing::warn!(
                            source_url = %product.source_url,
                            error = %e,
                            "upsert failed"
                        );
                        summary.errors += 1;
                    }
                }
            }

            processed += batch.len();
            if processed >= next_progress || processed == total {
                tracing::info!(
                    processed,
                    total,
                    inserted = summary.inserted,
                    updated = summary.updated,
                    errors = summary.errors,
                    "import progress"
                );
                while next_progress <= processed {
                    next_progress += progress_every;
                }
            }
        }

        summary
    }

    async fn upsert_one(&self, product: &NormalizedProduct) -> Result<UpsertOutcome, S::Error> {
        let unit = self.options.retry_unit;
        with_retry(
            self.options.max_retries,
            |attempt, err| {
                S::is_transient(err).then(|| backoff_delay(attempt, unit, Duration::ZERO))
            },
            || self.store.upsert(product),
        )
        .await
    }
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;

use shopdb_core::{CategoryDiscovery, CategoryFormat};

use super::{HandleCollector, ItemHandle, ItemPattern};
use crate::error::ScraperError;
use crate::fetcher::HttpFetcher;
use crate::html::extract_links;
use crate::origin::fill_template;
use crate::types::ShopifyListingResponse;

/// Walks each configured collection page by page.
///
/// A collection ends on an empty page, a page with no new handles, a 404, or
/// after `max_pages`. A failing collection is logged and skipped; the error
/// is returned only if nothing at all was discovered.
///
/// # Errors
///
/// Returns [`ScraperError`] if the pattern is invalid, or the first error
/// seen when every collection failed without yielding a handle.
pub async fn discover_category(
    http: &HttpFetcher,
    origin: &str,
    config: &CategoryDiscovery,
    max_items: usize,
) -> Result<Vec<ItemHandle>, ScraperError> {
    let pattern = ItemPattern::new(&config.item_pattern)?;
    let mut collector = HandleCollector::new(max_items);
    if max_items == 0 {
        return Ok(Vec::new());
    }

    let paginated = config.url_template.contains("{page}");
    let mut first_error: Option<ScraperError> = None;

    'collections: for collection in &config.collections {
        for page in 1..=config.max_pages.max(1) {
            if collector.is_full() {
                break 'collections;
            }
            if http.is_cancelled() {
                tracing::info!(
                    origin,
                    collection = %collection,
                    "cancellation requested; ending category crawl"
                );
                break 'collections;
            }

            let url = fill_template(&config.url_template, origin, Some(collection), page);
            let body = match http.fetch(&url, &[]).await {
                Ok(fetched) => fetched.body,
                Err(ScraperError::NotFound { .. }) if page > 1 => break,
                Err(e) => {
                    tracing::warn!(
                        url = %url,
                        collection = %collection,
                        error = %e,
                        "category page failed"
                    );
                    first_error.get_or_insert(e);
                    break;
                }
            };

            let found = match config.format {
                CategoryFormat::Json => match serde_json::from_str::<ShopifyListingResponse>(
                    &body,
                ) {
                    Ok(listing) => listing
                        .products
                        .iter()
                        .map(|p| ItemHandle::shopify(origin, &p.handle))
                        .collect::<Vec<_>>(),
                    Err(e) => {
                        tracing::warn!(
                            url = %url,
                            error = %e,
                            "category listing is not the expected JSON"
                        );
                        first_error.get_or_insert(ScraperError::Deserialize {
                            context: url.clone(),
                            source: e,
                        });
                        break;
                    }
                },
                CategoryFormat::Html => extract_links(&body)
                    .iter()
                    .filter_map(|link| pattern.match_link(origin, link))
                    .collect(),
            };

            let added = collector.extend(found);
            tracing::debug!(url = %url, added, "category page read");
            if added == 0 || !paginated {
                break;
            }
        }
    }

    if collector.is_empty() {
        if let Some(err) = first_error {
            return Err(err);
        }
    }
    Ok(collector.into_items())
}

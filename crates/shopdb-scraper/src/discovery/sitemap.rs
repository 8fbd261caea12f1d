use shopdb_core::SitemapDiscovery;

use super::{HandleCollector, ItemHandle, ItemPattern};
use crate::error::ScraperError;
use crate::fetcher::HttpFetcher;
use crate::html::sitemap_locs;
use crate::origin::fill_template;

/// Crawls product sitemaps.
///
/// With a `{page}` placeholder, pages 1, 2, ... are requested until a page
/// adds no new handles, returns 404, or `max_pages` is reached. Without one
/// the URL is fetched once. Sitemap indexes are followed one level deep,
/// preferring child sitemaps whose URL mentions products. Every fetch,
/// children included, counts against `max_pages`.
///
/// # Errors
///
/// Returns [`ScraperError`] if the pattern is invalid or the first sitemap
/// page cannot be fetched. Failures on later pages end the crawl with the
/// handles found so far.
pub async fn discover_sitemap(
    http: &HttpFetcher,
    origin: &str,
    config: &SitemapDiscovery,
    max_items: usize,
) -> Result<Vec<ItemHandle>, ScraperError> {
    let pattern = ItemPattern::new(&config.item_pattern)?;
    let mut collector = HandleCollector::new(max_items);
    if max_items == 0 {
        return Ok(Vec::new());
    }

    let paginated = config.url_template.contains("{page}");
    let mut budget = config.max_pages.max(1);
    let mut page = 1usize;

    while budget > 0 && !collector.is_full() {
        if http.is_cancelled() {
            tracing::info!(origin, page, "cancellation requested; ending sitemap crawl");
            break;
        }
        let url = fill_template(&config.url_template, origin, None, page);
        budget -= 1;

        let xml = match http.fetch(&url, &[]).await {
            Ok(fetched) => fetched.body,
            Err(ScraperError::NotFound { .. }) if page > 1 => break,
            Err(e) if page > 1 => {
                tracing::warn!(
                    url = %url,
                    error = %e,
                    "sitemap page failed; keeping handles found so far"
                );
                break;
            }
            Err(e) => return Err(e),
        };

        let added = read_document(http, origin, &xml, &pattern, &mut collector, &mut budget).await;
        tracing::debug!(url = %url, added, total = collector.items.len(), "sitemap page read");

        if !paginated || added == 0 {
            break;
        }
        page += 1;
    }

    if paginated && budget == 0 && !collector.is_full() {
        tracing::debug!(
            origin,
            max_pages = config.max_pages,
            "sitemap page bound reached"
        );
    }

    Ok(collector.into_items())
}

/// Adds item links from one sitemap document, following index entries.
async fn read_document(
    http: &HttpFetcher,
    origin: &str,
    xml: &str,
    pattern: &ItemPattern,
    collector: &mut HandleCollector,
    budget: &mut usize,
) -> usize {
    let locs = sitemap_locs(xml);
    let mut added = collector.extend(locs.iter().filter_map(|loc| pattern.match_link(origin, loc)));

    for child in child_sitemaps(&locs, pattern, origin) {
        if *budget == 0 || collector.is_full() || http.is_cancelled() {
            break;
        }
        *budget -= 1;
        match http.fetch(&child, &[]).await {
            Ok(fetched) => {
                let child_locs = sitemap_locs(&fetched.body);
                added += collector.extend(
                    child_locs
                        .iter()
                        .filter_map(|loc| pattern.match_link(origin, loc)),
                );
            }
            Err(e) => tracing::warn!(url = %child, error = %e, "child sitemap failed"),
        }
    }

    added
}

/// Index entries pointing at further sitemaps. Product sitemaps are preferred
/// when the index names any.
fn child_sitemaps(locs: &[String], pattern: &ItemPattern, origin: &str) -> Vec<String> {
    let nested: Vec<&String> = locs
        .iter()
        .filter(|loc| pattern.match_link(origin, loc).is_none() && looks_like_sitemap(loc))
        .collect();
    let products: Vec<String> = nested
        .iter()
        .filter(|loc| loc.to_lowercase().contains("product"))
        .map(|loc| (*loc).clone())
        .collect();
    if products.is_empty() {
        nested.into_iter().cloned().collect()
    } else {
        products
    }
}

fn looks_like_sitemap(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    std::path::Path::new(&path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

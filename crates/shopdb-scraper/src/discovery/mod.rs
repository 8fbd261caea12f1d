//! Catalog discovery: turning a source's sitemap or category pages into a
//! bounded, de-duplicated list of [`ItemHandle`]s.

mod category;
mod sitemap;

use std::collections::HashSet;

use regex::Regex;
use shopdb_core::DiscoveryConfig;

use crate::error::ScraperError;
use crate::fetcher::HttpFetcher;
use crate::origin::resolve_url;

pub use category::discover_category;
pub use sitemap::discover_sitemap;

/// A discovered catalog item: its stable slug and canonical page URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemHandle {
    pub handle: String,
    pub url: String,
}

impl ItemHandle {
    /// Shopify convention: the page lives at `{origin}/products/{handle}`.
    #[must_use]
    pub fn shopify(origin: &str, handle: &str) -> Self {
        Self {
            handle: handle.to_owned(),
            url: format!("{}/products/{handle}", origin.trim_end_matches('/')),
        }
    }
}

/// Runs whichever discovery family `config` selects.
///
/// # Errors
///
/// Returns [`ScraperError`] when the item pattern is invalid or the first
/// discovery page cannot be fetched.
pub async fn discover(
    http: &HttpFetcher,
    origin: &str,
    config: &DiscoveryConfig,
    max_items: usize,
) -> Result<Vec<ItemHandle>, ScraperError> {
    match config {
        DiscoveryConfig::Sitemap(sitemap) => {
            discover_sitemap(http, origin, sitemap, max_items).await
        }
        DiscoveryConfig::Category(category) => {
            discover_category(http, origin, category, max_items).await
        }
    }
}

/// Compiled `item_pattern`: capture group 1 is the handle, the full match is
/// the item's page path.
#[derive(Debug, Clone)]
pub struct ItemPattern {
    re: Regex,
}

impl ItemPattern {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidPattern`] if `pattern` does not compile
    /// or has no capture group.
    pub fn new(pattern: &str) -> Result<Self, ScraperError> {
        let re = Regex::new(pattern).map_err(|e| ScraperError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        if re.captures_len() < 2 {
            return Err(ScraperError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: "pattern needs a capture group for the handle".to_owned(),
            });
        }
        Ok(Self { re })
    }

    /// Matches one link. The page URL is the full match resolved against
    /// `origin`, which drops query strings and fragments.
    #[must_use]
    pub fn match_link(&self, origin: &str, link: &str) -> Option<ItemHandle> {
        let caps = self.re.captures(link)?;
        let handle = caps.get(1)?.as_str().trim_matches('/');
        if handle.is_empty() {
            return None;
        }
        let url = resolve_url(origin, caps.get(0)?.as_str())?;
        Some(ItemHandle {
            handle: handle.to_owned(),
            url,
        })
    }
}

/// Ordered, de-duplicated, size-bounded handle accumulator.
pub(crate) struct HandleCollector {
    seen: HashSet<String>,
    items: Vec<ItemHandle>,
    limit: usize,
}

impl HandleCollector {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
            limit,
        }
    }

    /// Adds `items` in order, returning how many were new.
    pub(crate) fn extend(&mut self, items: impl IntoIterator<Item = ItemHandle>) -> usize {
        let mut added = 0;
        for item in items {
            if self.is_full() {
                break;
            }
            if self.seen.insert(item.handle.clone()) {
                self.items.push(item);
                added += 1;
            }
        }
        added
    }

    pub(crate) fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn into_items(self) -> Vec<ItemHandle> {
        self.items
    }
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;

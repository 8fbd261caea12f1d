//! The per-source adapter contract and its two implementations.
//!
//! An adapter discovers a source's catalog, fetches one item's raw detail
//! payload through the shared [`HttpFetcher`], and normalizes that payload.
//! Adapters are used as `Box<dyn Adapter>` from the registry, so the async
//! methods return boxed futures.

mod json_ld;
mod shopify;

use std::collections::HashMap;

use futures::future::BoxFuture;
use serde_json::Value;
use shopdb_core::NormalizedProduct;

use crate::discovery::ItemHandle;
use crate::error::ScraperError;
use crate::fetcher::HttpFetcher;
use crate::types::ShopifyProduct;

pub use json_ld::JsonLdAdapter;
pub use shopify::ShopifyAdapter;

/// A detail payload in whichever shape its source produces.
#[derive(Debug, Clone)]
pub enum RawPayload {
    /// `/products/{handle}.json`, optionally with a variant availability map
    /// scraped from the product page.
    Shopify {
        product: ShopifyProduct,
        availability: Option<HashMap<String, bool>>,
    },
    /// A schema.org `Product` node and the page it came from.
    JsonLd { url: String, product: Value },
}

pub trait Adapter: Send + Sync {
    /// Source name; also the CLI flag and `source_platform`.
    fn name(&self) -> &str;

    /// Lists up to `max_items` catalog items, de-duplicated, in discovery
    /// order.
    fn discover<'a>(
        &'a self,
        http: &'a HttpFetcher,
        max_items: usize,
    ) -> BoxFuture<'a, Result<Vec<ItemHandle>, ScraperError>>;

    /// Fetches one item. `Ok(None)` means the item no longer exists and is
    /// skipped without being counted as an error.
    fn fetch_detail<'a>(
        &'a self,
        http: &'a HttpFetcher,
        item: &'a ItemHandle,
    ) -> BoxFuture<'a, Result<Option<RawPayload>, ScraperError>>;

    /// Pure conversion; `None` drops the item silently.
    fn normalize(&self, payload: RawPayload) -> Option<NormalizedProduct>;
}

#[cfg(test)]
#[path = "adapter_test.rs"]
mod tests;

use futures::future::BoxFuture;
use futures::FutureExt;
use shopdb_core::{DiscoveryConfig, NormalizedProduct, SourceDefinition};

use super::{Adapter, RawPayload};
use crate::discovery::{discover, ItemHandle};
use crate::error::ScraperError;
use crate::fetcher::HttpFetcher;
use crate::html::parse_variant_availability;
use crate::normalize::{normalize_shopify, SourceContext};
use crate::types::ShopifyProductResponse;

/// Shopify storefronts: JSON detail from `/products/{handle}.json`, with
/// optional live availability from the product page.
#[derive(Debug, Clone)]
pub struct ShopifyAdapter {
    ctx: SourceContext,
    discovery: DiscoveryConfig,
    html_availability: bool,
}

impl ShopifyAdapter {
    #[must_use]
    pub fn new(definition: &SourceDefinition) -> Self {
        Self {
            ctx: SourceContext::from_definition(definition),
            discovery: definition.discovery.clone(),
            html_availability: definition.html_availability,
        }
    }

    fn detail_url(&self, handle: &str) -> String {
        format!("{}/products/{handle}.json", self.ctx.origin.trim_end_matches('/'))
    }

    async fn fetch_detail_inner(
        &self,
        http: &HttpFetcher,
        item: &ItemHandle,
    ) -> Result<Option<RawPayload>, ScraperError> {
        let url = self.detail_url(&item.handle);
        let product = match http.fetch_json::<ShopifyProductResponse>(&url).await {
            Ok(response) => response.product,
            Err(ScraperError::NotFound { .. }) => {
                tracing::debug!(
                    source = %self.ctx.platform,
                    handle = %item.handle,
                    "product no longer listed"
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let availability = if self.html_availability {
            match http.fetch(&item.url, &[]).await {
                Ok(page) => parse_variant_availability(&page.body),
                Err(e) => {
                    tracing::warn!(
                        source = %self.ctx.platform,
                        url = %item.url,
                        error = %e,
                        "product page unavailable; using JSON availability"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Some(RawPayload::Shopify {
            product,
            availability,
        }))
    }
}

impl Adapter for ShopifyAdapter {
    fn name(&self) -> &str {
        &self.ctx.platform
    }

    fn discover<'a>(
        &'a self,
        http: &'a HttpFetcher,
        max_items: usize,
    ) -> BoxFuture<'a, Result<Vec<ItemHandle>, ScraperError>> {
        discover(http, &self.ctx.origin, &self.discovery, max_items).boxed()
    }

    fn fetch_detail<'a>(
        &'a self,
        http: &'a HttpFetcher,
        item: &'a ItemHandle,
    ) -> BoxFuture<'a, Result<Option<RawPayload>, ScraperError>> {
        self.fetch_detail_inner(http, item).boxed()
    }

    fn normalize(&self, payload: RawPayload) -> Option<NormalizedProduct> {
        match payload {
            RawPayload::Shopify {
                product,
                availability,
            } => normalize_shopify(&product, availability.as_ref(), &self.ctx),
            RawPayload::JsonLd { url, .. } => {
                tracing::warn!(
                    source = %self.ctx.platform,
                    url = %url,
                    "unexpected JSON-LD payload for a Shopify source"
                );
                None
            }
        }
    }
}

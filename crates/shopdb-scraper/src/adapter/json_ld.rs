use futures::future::BoxFuture;
use futures::FutureExt;
use shopdb_core::{DiscoveryConfig, NormalizedProduct, SourceDefinition};

use super::{Adapter, RawPayload};
use crate::discovery::{discover, ItemHandle};
use crate::error::ScraperError;
use crate::fetcher::HttpFetcher;
use crate::html::extract_json_ld_product;
use crate::normalize::{normalize_json_ld, SourceContext};

/// Any storefront that embeds a schema.org `Product` in its product pages.
#[derive(Debug, Clone)]
pub struct JsonLdAdapter {
    ctx: SourceContext,
    discovery: DiscoveryConfig,
}

impl JsonLdAdapter {
    #[must_use]
    pub fn new(definition: &SourceDefinition) -> Self {
        Self {
            ctx: SourceContext::from_definition(definition),
            discovery: definition.discovery.clone(),
        }
    }

    async fn fetch_detail_inner(
        &self,
        http: &HttpFetcher,
        item: &ItemHandle,
    ) -> Result<Option<RawPayload>, ScraperError> {
        let page = match http.fetch(&item.url, &[]).await {
            Ok(page) => page,
            Err(ScraperError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let product =
            extract_json_ld_product(&page.body).ok_or_else(|| ScraperError::Normalization {
                source_product_id: item.handle.clone(),
                reason: "page has no schema.org Product node".to_owned(),
            })?;

        Ok(Some(RawPayload::JsonLd {
            url: item.url.clone(),
            product,
        }))
    }
}

impl Adapter for JsonLdAdapter {
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
            RawPayload::JsonLd { url, product } => normalize_json_ld(&url, &product, &self.ctx),
            RawPayload::Shopify { product, .. } => {
                tracing::warn!(
                    source = %self.ctx.platform,
                    handle = %product.handle,
                    "unexpected Shopify payload for a JSON-LD source"
                );
                None
            }
        }
    }
}

use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::json;
use shopdb_core::Condition;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::adapter::RawPayload;
use crate::discovery::ItemHandle;
use crate::fetcher::FetchPolicy;
use crate::normalize::{normalize_json_ld, SourceContext};

#[derive(Clone, Copy)]
enum Behavior {
    Ok,
    FailDiscovery,
    PanicInDiscovery,
    FailSecondItem,
}

struct FakeAdapter {
    ctx: SourceContext,
    items: usize,
    behavior: Behavior,
}

impl FakeAdapter {
    fn new(name: &str, items: usize, behavior: Behavior) -> Self {
        Self {
            ctx: SourceContext {
                platform: name.to_owned(),
                brand: name.to_uppercase(),
                origin: format!("https://{name}.test"),
                default_gender: None,
                condition: Condition::New,
            },
            items,
            behavior,
        }
    }
}

impl Adapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.ctx.platform
    }

    fn discover<'a>(
        &'a self,
        _http: &'a HttpFetcher,
        max_items: usize,
    ) -> BoxFuture<'a, Result<Vec<ItemHandle>, ScraperError>> {
        Box::pin(async move {
            match self.behavior {
                Behavior::FailDiscovery => Err(ScraperError::UnexpectedStatus {
                    status: 503,
                    url: format!("{}/sitemap.xml", self.ctx.origin),
                }),
                Behavior::PanicInDiscovery => panic!("sitemap parser exploded"),
                Behavior::Ok | Behavior::FailSecondItem => Ok((0..self.items.min(max_items))
                    .map(|i| ItemHandle::shopify(&self.ctx.origin, &format!("item-{i}")))
                    .collect()),
            }
        })
    }

    fn fetch_detail<'a>(
        &'a self,
        _http: &'a HttpFetcher,
        item: &'a ItemHandle,
    ) -> BoxFuture<'a, Result<Option<RawPayload>, ScraperError>> {
        Box::pin(async move {
            if matches!(self.behavior, Behavior::FailSecondItem) && item.handle == "item-1" {
                return Err(ScraperError::Deserialize {
                    context: item.url.clone(),
                    source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
                });
            }
            if item.handle == "item-2" {
                return Ok(None);
            }
            let name = if item.handle == "item-3" { "" } else { "Tee" };
            Ok(Some(RawPayload::JsonLd {
                url: item.url.clone(),
                product: json!({"name": name, "offers": {"price": "20.00"}}),
            }))
        })
    }

    fn normalize(&self, payload: RawPayload) -> Option<NormalizedProduct> {
        match payload {
            RawPayload::JsonLd { url, product } => normalize_json_ld(&url, &product, &self.ctx),
            RawPayload::Shopify { .. } => None,
        }
    }
}

fn http(cancel: CancellationToken) -> HttpFetcher {
    let policy = FetchPolicy {
        jitter_max: Duration::ZERO,
        penalty_delay: Duration::ZERO,
        backoff_unit: Duration::ZERO,
        ..FetchPolicy::default()
    };
    HttpFetcher::new(policy, cancel).unwrap()
}

fn registry(adapters: Vec<FakeAdapter>) -> SourceRegistry {
    let mut registry = SourceRegistry::empty();
    for adapter in adapters {
        registry.register(Box::new(adapter));
    }
    registry
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

#[tokio::test]
async fn failing_source_does_not_stop_later_sources() {
    let registry = registry(vec![
        FakeAdapter::new("broken", 2, Behavior::FailDiscovery),
        FakeAdapter::new("healthy", 2, Behavior::Ok),
    ]);
    let orchestrator = Orchestrator::new(&registry, http(CancellationToken::new()));

    let outcome = orchestrator.run(&names(&["broken", "healthy"]), 10).await;

    assert_eq!(outcome.per_source.len(), 2);
    let broken = &outcome.per_source[0];
    assert_eq!(broken.source, "broken");
    assert_eq!(broken.product_count(), 0);
    assert_eq!(broken.errors.len(), 1);
    assert!(broken.errors[0].contains("503"));

    let healthy = &outcome.per_source[1];
    assert_eq!(healthy.product_count(), 2);
    assert!(healthy.errors.is_empty());
    assert_eq!(outcome.products().len(), 2);
}

#[tokio::test]
async fn panicking_adapter_is_recorded_and_skipped() {
    let registry = registry(vec![
        FakeAdapter::new("crashy", 1, Behavior::PanicInDiscovery),
        FakeAdapter::new("healthy", 1, Behavior::Ok),
    ]);
    let orchestrator = Orchestrator::new(&registry, http(CancellationToken::new()));

    let outcome = orchestrator.run(&names(&["crashy", "healthy"]), 10).await;

    assert!(outcome.per_source[0].errors[0].contains("sitemap parser exploded"));
    assert_eq!(outcome.per_source[1].product_count(), 1);
}

#[tokio::test]
async fn item_failures_become_error_strings_and_drops_are_silent() {
    let registry = registry(vec![FakeAdapter::new("mixed", 5, Behavior::FailSecondItem)]);
    let orchestrator = Orchestrator::new(&registry, http(CancellationToken::new()));

    let outcome = orchestrator.run(&names(&["mixed"]), 10).await;
    let result = &outcome.per_source[0];

    // item-1 fails, item-2 is gone upstream, item-3 has no name.
    assert_eq!(result.product_count(), 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("https://mixed.test/products/item-1"));
    assert_eq!(outcome.error_count(), 1);
}

#[tokio::test]
async fn unknown_sources_are_skipped() {
    let registry = registry(vec![FakeAdapter::new("healthy", 1, Behavior::Ok)]);
    let orchestrator = Orchestrator::new(&registry, http(CancellationToken::new()));

    let outcome = orchestrator.run(&names(&["nope", "healthy"]), 10).await;

    assert_eq!(outcome.unknown_sources, vec!["nope"]);
    assert_eq!(outcome.per_source.len(), 1);
    assert_eq!(outcome.per_source[0].source, "healthy");
}

#[tokio::test]
async fn max_items_bounds_each_source() {
    let registry = registry(vec![FakeAdapter::new("big", 50, Behavior::Ok)]);
    let orchestrator = Orchestrator::new(&registry, http(CancellationToken::new()));

    let outcome = orchestrator.run(&names(&["big"]), 2).await;

    assert_eq!(outcome.per_source[0].product_count(), 2);
}

#[tokio::test]
async fn cancelled_run_starts_no_sources() {
    let registry = registry(vec![
        FakeAdapter::new("first", 1, Behavior::Ok),
        FakeAdapter::new("second", 1, Behavior::Ok),
    ]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let orchestrator = Orchestrator::new(&registry, http(cancel));

    let outcome = orchestrator.run(&names(&["first", "second"]), 10).await;

    assert!(outcome.per_source.is_empty());
    assert_eq!(outcome.not_started, vec!["first", "second"]);
}

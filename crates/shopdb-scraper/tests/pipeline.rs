//! End-to-end scrape runs: YAML source definitions → registry →
//! orchestrator → normalized products, against local `wiremock` stores.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopdb_core::{load_sources, parse_sources, Gender, SourcesFile};
use shopdb_scraper::{FetchPolicy, HttpFetcher, Orchestrator, SourceRegistry};

fn http() -> HttpFetcher {
    let policy = FetchPolicy {
        max_retries: 1,
        jitter_max: Duration::ZERO,
        backoff_unit: Duration::ZERO,
        penalty_delay: Duration::ZERO,
        ..FetchPolicy::default()
    };
    HttpFetcher::new(policy, CancellationToken::new()).expect("failed to build test fetcher")
}

fn urlset(origin: &str, handles: &[&str]) -> String {
    let entries: String = handles
        .iter()
        .map(|h| format!("<url><loc>{origin}/products/{h}</loc></url>"))
        .collect();
    format!(r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#)
}

async fn mount_shopify_store(server: &MockServer) {
    let origin = server.uri();
    Mock::given(method("GET"))
        .and(path("/sitemap_products_1.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(
            &origin,
            &["heather-grey-charcoal-hoodie", "gift-card", "retired-tee"],
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap_products_2.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&origin, &[])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products/heather-grey-charcoal-hoodie.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"product": {
            "id": 7,
            "title": "Heather Grey Charcoal Hoodie",
            "handle": "heather-grey-charcoal-hoodie",
            "body_html": "<p>Brushed fleece.</p>",
            "product_type": "",
            "tags": ["women", "fabric:organic cotton"],
            "options": [{"name": "Size", "values": ["S", "M", "L"]}],
            "variants": [
                {"id": 71, "title": "S", "price": "29.99", "compare_at_price": "39.99", "option1": "S"},
                {"id": 72, "title": "M", "price": "24.99", "compare_at_price": null, "option1": "M"},
                {"id": 73, "title": "L", "price": "34.99", "compare_at_price": null, "option1": "L"}
            ],
            "images": [{"src": "https://cdn.test/hoodie.jpg", "position": 1}]
        }})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/heather-grey-charcoal-hoodie"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<script type="application/json" id="ProductJson">{"variants":[{"id":71,"available":true},{"id":72,"available":true},{"id":73,"available":false}]}</script>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products/gift-card.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"product": {
            "id": 8,
            "title": "Gift Card",
            "handle": "gift-card",
            "product_type": "Gift Card",
            "variants": [{"id": 81, "title": "$50", "price": "50.00", "available": false}]
        }})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/gift-card"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn shopify_source_scrapes_and_normalizes_catalog() {
    let store = MockServer::start().await;
    mount_shopify_store(&store).await;

    let yaml = format!(
        r"
sources:
  - name: kotn
    brand: Kotn
    base_url: {}
    adapter: shopify
    html_availability: true
    discovery:
      sitemap: {{}}
",
        store.uri()
    );
    let registry = SourceRegistry::from_sources(&parse_sources(&yaml).unwrap());
    let outcome = Orchestrator::new(&registry, http())
        .run(&["kotn".to_owned()], 500)
        .await;

    let result = &outcome.per_source[0];
    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    // The gift card is filtered and retired-tee 404s; neither is an error.
    assert_eq!(result.product_count(), 1);

    let hoodie = &result.products[0];
    assert_eq!(hoodie.price, Decimal::from_str("24.99").unwrap());
    assert_eq!(hoodie.original_price, Some(Decimal::from_str("39.99").unwrap()));
    assert_eq!(hoodie.category, "sweaters");
    assert_eq!(hoodie.color_hex.as_deref(), Some("#36454F"));
    assert_eq!(hoodie.gender, Some(Gender::Women));
    assert_eq!(hoodie.material.as_deref(), Some("Organic Cotton"));
    assert_eq!(hoodie.source_platform, "kotn");
    assert!(!hoodie.variants[2].available);
    assert_eq!(
        hoodie.source_url,
        format!("{}/products/heather-grey-charcoal-hoodie", store.uri())
    );
}

#[tokio::test]
async fn repository_sources_file_drives_a_run() {
    let config = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/sources.yaml");
    let file = load_sources(&config).expect("config/sources.yaml should load");

    let registry = SourceRegistry::from_sources(&file);
    assert_eq!(
        registry.names(),
        vec!["kotn", "taylorstitch", "outdoorvoices", "pact", "thredup"]
    );
    assert_eq!(registry.default_source(), Some("kotn"));

    // Same definition, pointed at a local store.
    let store = MockServer::start().await;
    mount_shopify_store(&store).await;
    let mut kotn = file
        .sources
        .iter()
        .find(|s| s.name == "kotn")
        .cloned()
        .expect("kotn is configured");
    kotn.base_url = store.uri();
    let local = SourceRegistry::from_sources(&SourcesFile {
        sources: vec![kotn],
    });

    let outcome = Orchestrator::new(&local, http())
        .run(&["kotn".to_owned()], 500)
        .await;

    let result = &outcome.per_source[0];
    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    assert_eq!(result.product_count(), 1);
    assert_eq!(result.products[0].brand, "Kotn");
    assert!(!result.products[0].variants[2].available);
}

#[tokio::test]
async fn broken_source_does_not_block_the_next() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;

    let healthy = MockServer::start().await;
    mount_shopify_store(&healthy).await;

    let yaml = format!(
        r"
sources:
  - name: broken
    brand: Broken
    base_url: {}
    adapter: shopify
    discovery:
      sitemap: {{}}
  - name: kotn
    brand: Kotn
    base_url: {}
    adapter: shopify
    discovery:
      sitemap: {{}}
",
        broken.uri(),
        healthy.uri()
    );
    let registry = SourceRegistry::from_sources(&parse_sources(&yaml).unwrap());
    let outcome = Orchestrator::new(&registry, http())
        .run(&["broken".to_owned(), "kotn".to_owned()], 500)
        .await;

    assert_eq!(outcome.per_source.len(), 2);
    assert_eq!(outcome.per_source[0].product_count(), 0);
    assert_eq!(outcome.per_source[0].errors.len(), 1);
    assert_eq!(outcome.per_source[1].product_count(), 1);
    assert_eq!(outcome.products().len(), 1);
}

#[tokio::test]
async fn json_ld_source_reads_product_pages() {
    let store = MockServer::start().await;
    let origin = store.uri();
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<urlset><url><loc>{origin}/women/tops/organic-tee</loc></url>\
             <url><loc>{origin}/about-us</loc></url></urlset>"
        )))
        .mount(&store)
        .await;
    Mock::given(method("GET"))
        .and(path("/women/tops/organic-tee"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<script type="application/ld+json">{"@context":"https://schema.org","@graph":[
                {"@type":"BreadcrumbList"},
                {"@type":"Product","name":"Organic Tee","brand":{"@type":"Brand","name":"Pact"},
                 "offers":{"@type":"Offer","price":"25.00","availability":"https://schema.org/InStock"}}]}
            </script>"#,
        ))
        .mount(&store)
        .await;

    let yaml = format!(
        r#"
sources:
  - name: pact
    brand: Pact
    base_url: {origin}
    adapter: json_ld
    discovery:
      sitemap:
        url_template: "{{origin}}/sitemap.xml"
        item_pattern: "/(?:women|men)/[a-z0-9\\-]+/([a-z0-9][a-z0-9\\-]*)"
"#
    );
    let registry = SourceRegistry::from_sources(&parse_sources(&yaml).unwrap());
    let outcome = Orchestrator::new(&registry, http())
        .run(&["pact".to_owned()], 500)
        .await;

    let result = &outcome.per_source[0];
    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    assert_eq!(result.product_count(), 1);
    assert_eq!(result.products[0].name, "Organic Tee");
    assert_eq!(result.products[0].category, "tops");
    assert_eq!(result.products[0].gender, Some(Gender::Women));
}

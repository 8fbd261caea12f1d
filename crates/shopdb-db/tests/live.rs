//! Live integration tests for shopdb-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/shopdb-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory. Run with `--ignored` and a Postgres `DATABASE_URL`.

use std::str::FromStr;

use rust_decimal::Decimal;
use shopdb_core::{
    Condition, Gender, NormalizedProduct, ProductStore, UpsertAction, Variant,
};
use shopdb_db::{
    get_product_by_source_url, list_price_history, ping, run_migrations,
    upsert_product_by_source_url, PgProductStore,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn make_product(source_url: &str, price: &str) -> NormalizedProduct {
    NormalizedProduct {
        name: "Organic Crew Tee".to_string(),
        description: "Soft jersey tee.".to_string(),
        brand: "Kotn".to_string(),
        price: dec(price),
        original_price: None,
        material: Some("Organic Cotton".to_string()),
        category: "tops".to_string(),
        gender: Some(Gender::Women),
        condition: Condition::New,
        source_url: source_url.to_string(),
        source_platform: "kotn".to_string(),
        image_url: Some("https://cdn.test/tee.jpg".to_string()),
        image_urls: vec!["https://cdn.test/tee.jpg".to_string()],
        variants: vec![Variant {
            id: "101".to_string(),
            title: "S".to_string(),
            available: false,
            price: Some(dec(price)),
            option1: Some("S".to_string()),
            option2: None,
            option3: None,
        }],
        options: vec![],
        color_group_id: None,
        color_name: Some("Bone".to_string()),
        color_hex: None,
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn ping_and_migrations_are_noops_on_migrated_db(pool: sqlx::PgPool) {
    ping(&pool).await.expect("ping failed");
    let applied = run_migrations(&pool).await.expect("run_migrations failed");
    assert_eq!(applied, 0, "sqlx::test already applied every migration");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn upsert_inserts_then_updates_without_duplicates(pool: sqlx::PgPool) {
    let product = make_product("https://kotn.test/products/crew", "30.00");

    let first = upsert_product_by_source_url(&pool, &product)
        .await
        .expect("first upsert failed");
    let second = upsert_product_by_source_url(&pool, &product)
        .await
        .expect("second upsert failed");

    assert_eq!(first.action, UpsertAction::Inserted);
    assert_eq!(second.action, UpsertAction::Updated);
    assert_eq!(first.id, second.id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let history = list_price_history(&pool, first.id).await.unwrap();
    assert_eq!(history.len(), 1, "unchanged price must not append history");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn price_change_appends_history_and_patches_row(pool: sqlx::PgPool) {
    let url = "https://kotn.test/products/crew";
    let original = make_product(url, "30.00");
    let mut discounted = make_product(url, "24.00");
    discounted.original_price = Some(dec("30.00"));
    discounted.name = "Organic Crew Tee (Final Sale)".to_string();

    let inserted = upsert_product_by_source_url(&pool, &original).await.unwrap();
    upsert_product_by_source_url(&pool, &discounted).await.unwrap();

    let row = get_product_by_source_url(&pool, url)
        .await
        .unwrap()
        .expect("row should exist");
    assert_eq!(row.price, dec("24.00"));
    assert_eq!(row.original_price, Some(dec("30.00")));
    assert_eq!(row.name, "Organic Crew Tee (Final Sale)");
    assert_eq!(row.gender.as_deref(), Some("women"));
    assert!(!row.in_stock);
    assert_eq!(row.variants.0.len(), 1);

    let history = list_price_history(&pool, inserted.id).await.unwrap();
    let prices: Vec<Decimal> = history.iter().map(|h| h.price).collect();
    assert_eq!(prices, vec![dec("30.00"), dec("24.00")]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn pg_store_implements_product_store(pool: sqlx::PgPool) {
    let store = PgProductStore::new(pool.clone());
    let product = make_product("https://kotn.test/products/henley", "45.00");

    let outcome = store.upsert(&product).await.expect("store upsert failed");
    assert_eq!(outcome.action, UpsertAction::Inserted);
    assert!(get_product_by_source_url(store.pool(), &product.source_url)
        .await
        .unwrap()
        .is_some());
}

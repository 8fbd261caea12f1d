//! Database operations for `products` and `product_price_history`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shopdb_core::{
    NormalizedProduct, ProductOption, ProductStore, UpsertAction, UpsertOutcome, Variant,
};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub source_url: String,
    pub source_platform: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub material: Option<String>,
    pub category: String,
    /// `"men"`, `"women"`, `"unisex"`, or `NULL`.
    pub gender: Option<String>,
    pub condition: String,
    pub image_url: Option<String>,
    pub image_urls: Json<Vec<String>>,
    pub variants: Json<Vec<Variant>>,
    pub options: Json<Vec<ProductOption>>,
    /// Denormalized from `variants` at write time.
    pub in_stock: bool,
    pub color_group_id: Option<String>,
    pub color_name: Option<String>,
    pub color_hex: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `product_price_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub id: i64,
    pub product_id: i64,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// products operations
// ---------------------------------------------------------------------------

/// Inserts or updates a product keyed by `source_url`, keeping its price
/// history in step.
///
/// A new row is seeded with one history entry. An existing row has every
/// scraped field patched in place and gains a history entry only when
/// `price` or `original_price` changed, so re-importing an unchanged product
/// reports [`UpsertAction::Updated`] and leaves the history untouched.
///
/// Runs in one transaction; the existing row, if any, is locked for the
/// duration.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn upsert_product_by_source_url(
    pool: &PgPool,
    product: &NormalizedProduct,
) -> Result<UpsertOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let previous: Option<(Decimal, Option<Decimal>)> = sqlx::query_as(
        "SELECT price, original_price FROM products WHERE source_url = $1 FOR UPDATE",
    )
    .bind(&product.source_url)
    .fetch_optional(&mut *tx)
    .await?;

    let (id, inserted): (i64, bool) = sqlx::query_as(
        "INSERT INTO products \
             (source_url, source_platform, name, description, brand, price, original_price, \
              material, category, gender, condition, image_url, image_urls, variants, options, \
              in_stock, color_group_id, color_name, color_hex) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, \
                 $8, $9, $10, $11, $12, $13, $14, $15, \
                 $16, $17, $18, $19) \
         ON CONFLICT (source_url) DO UPDATE SET \
             source_platform = EXCLUDED.source_platform, \
             name            = EXCLUDED.name, \
             description     = EXCLUDED.description, \
             brand           = EXCLUDED.brand, \
             price           = EXCLUDED.price, \
             original_price  = EXCLUDED.original_price, \
             material        = EXCLUDED.material, \
             category        = EXCLUDED.category, \
             gender          = EXCLUDED.gender, \
             condition       = EXCLUDED.condition, \
             image_url       = EXCLUDED.image_url, \
             image_urls      = EXCLUDED.image_urls, \
             variants        = EXCLUDED.variants, \
             options         = EXCLUDED.options, \
             in_stock        = EXCLUDED.in_stock, \
             color_group_id  = EXCLUDED.color_group_id, \
             color_name      = EXCLUDED.color_name, \
             color_hex       = EXCLUDED.color_hex, \
             updated_at      = NOW() \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(&product.source_url)
    .bind(&product.source_platform)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.brand)
    .bind(product.price)
    .bind(product.original_price)
    .bind(&product.material)
    .bind(&product.category)
    .bind(product.gender.map(shopdb_core::Gender::as_str))
    .bind(product.condition.as_str())
    .bind(&product.image_url)
    .bind(Json(&product.image_urls))
    .bind(Json(&product.variants))
    .bind(Json(&product.options))
    .bind(product.has_available_variants())
    .bind(&product.color_group_id)
    .bind(&product.color_name)
    .bind(&product.color_hex)
    .fetch_one(&mut *tx)
    .await?;

    // A row inserted concurrently after our SELECT comes back as an update
    // with no previous price; the other writer seeded its history.
    let price_moved = previous.is_some_and(|(price, original)| {
        price != product.price || original != product.original_price
    });
    if inserted || price_moved {
        sqlx::query(
            "INSERT INTO product_price_history (product_id, price, original_price) \
             VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(product.price)
        .bind(product.original_price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(UpsertOutcome {
        id,
        action: if inserted {
            UpsertAction::Inserted
        } else {
            UpsertAction::Updated
        },
    })
}

/// Returns the product stored under `source_url`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_source_url(
    pool: &PgPool,
    source_url: &str,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, source_url, source_platform, name, description, brand, price, \
                original_price, material, category, gender, condition, image_url, image_urls, \
                variants, options, in_stock, color_group_id, color_name, color_hex, \
                created_at, updated_at \
         FROM products \
         WHERE source_url = $1",
    )
    .bind(source_url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Price history for a product, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_price_history(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<PriceHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceHistoryRow>(
        "SELECT id, product_id, price, original_price, recorded_at \
         FROM product_price_history \
         WHERE product_id = $1 \
         ORDER BY recorded_at ASC, id ASC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// ProductStore
// ---------------------------------------------------------------------------

/// [`ProductStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ProductStore for PgProductStore {
    type Error = DbError;

    async fn upsert(&self, product: &NormalizedProduct) -> Result<UpsertOutcome, DbError> {
        upsert_product_by_source_url(&self.pool, product).await
    }

    fn is_transient(error: &DbError) -> bool {
        error.is_transient()
    }
}

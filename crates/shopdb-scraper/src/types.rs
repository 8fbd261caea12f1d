//! Shopify storefront payload types.
//!
//! ## Observed shapes
//!
//! ### Detail endpoint
//! `GET /products/{handle}.json` wraps a single product:
//! `{"product": {...}}`. Unlike the listing endpoint, `tags` arrives as a
//! comma-separated string (`"fabric:organic cotton, ygroup_crew"`); some
//! themes proxy it as an array. Both are accepted.
//!
//! ### Prices
//! Decimal strings (`"29.99"`); a few proxies emit bare numbers. Both are
//! kept as strings and parsed during normalization.
//!
//! ### `available` on variants
//! Absent from the detail endpoint on many stores. Defaults to `true`; the
//! product page's inline variant JSON is the reliable source when enabled.

use serde::{Deserialize, Deserializer};

/// Response from `GET /products/{handle}.json`.
#[derive(Debug, Deserialize)]
pub struct ShopifyProductResponse {
    pub product: ShopifyProduct,
}

/// Response from a collection listing such as
/// `GET /collections/{collection}/products.json`. Only handles are used.
#[derive(Debug, Deserialize)]
pub struct ShopifyListingResponse {
    #[serde(default)]
    pub products: Vec<ShopifyListingItem>,
}

#[derive(Debug, Deserialize)]
pub struct ShopifyListingItem {
    pub handle: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyProduct {
    pub id: i64,
    pub title: String,
    pub handle: String,

    #[serde(default)]
    pub body_html: Option<String>,

    /// May be an empty string.
    #[serde(default)]
    pub product_type: Option<String>,

    #[serde(default)]
    pub vendor: Option<String>,

    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub options: Vec<ShopifyOption>,

    #[serde(default)]
    pub variants: Vec<ShopifyVariant>,

    #[serde(default)]
    pub image: Option<ShopifyImage>,

    #[serde(default)]
    pub images: Vec<ShopifyImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOption {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyVariant {
    pub id: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<String>,

    /// `null` when the variant is not on sale.
    #[serde(default, deserialize_with = "deserialize_price")]
    pub compare_at_price: Option<String>,

    #[serde(default = "default_available")]
    pub available: bool,

    #[serde(default)]
    pub sku: Option<String>,

    #[serde(default)]
    pub option1: Option<String>,
    #[serde(default)]
    pub option2: Option<String>,
    #[serde(default)]
    pub option3: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyImage {
    pub src: String,
    #[serde(default)]
    pub position: Option<i32>,
}

fn default_available() -> bool {
    true
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Joined(String),
    }

    let tags = match Option::<Tags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Tags::List(list)) => list,
        Some(Tags::Joined(joined)) => joined.split(',').map(str::to_owned).collect(),
    };
    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect())
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Price {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Price>::deserialize(deserializer)? {
        None => None,
        Some(Price::Text(text)) if text.trim().is_empty() => None,
        Some(Price::Text(text)) => Some(text.trim().to_owned()),
        Some(Price::Number(number)) => Some(number.to_string()),
    })
}

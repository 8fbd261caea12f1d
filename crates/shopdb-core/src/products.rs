use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Men,
    Women,
    Unisex,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Men => "men",
            Gender::Women => "women",
            Gender::Unisex => "unisex",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    New,
    Used,
    LikeNew,
}

impl Condition {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
            Condition::LikeNew => "like_new",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product listing from any source, normalized into the catalog schema.
///
/// `source_url` is the identity key: two products with the same URL are the
/// same logical item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProduct {
    pub name: String,
    /// Plain-text description with markup stripped.
    pub description: String,
    pub brand: String,
    /// Lowest variant price. Always positive.
    pub price: Decimal,
    /// Highest compare-at price strictly above `price`, if any.
    pub original_price: Option<Decimal>,
    pub material: Option<String>,
    pub category: String,
    pub gender: Option<Gender>,
    pub condition: Condition,
    /// Canonical storefront URL, e.g. `"https://kotn.com/products/essential-tee"`.
    pub source_url: String,
    /// Name of the source that produced this product.
    pub source_platform: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
    /// Links sibling listings that are the same product in different colors.
    pub color_group_id: Option<String>,
    pub color_name: Option<String>,
    pub color_hex: Option<String>,
}

impl NormalizedProduct {
    /// Returns `true` if at least one variant is purchasable.
    ///
    /// Products without variant data are treated as available.
    #[must_use]
    pub fn has_available_variants(&self) -> bool {
        self.variants.is_empty() || self.variants.iter().any(|v| v.available)
    }

    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.original_price.is_some_and(|orig| orig > self.price)
    }
}

/// A single purchasable variant, e.g. one size of one color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Source variant ID, stored as a string to avoid precision loss.
    pub id: String,
    pub title: String,
    pub available: bool,
    pub price: Option<Decimal>,
    pub option1: Option<String>,
    pub option2: Option<String>,
    pub option3: Option<String>,
}

/// A product option axis, e.g. `Size` with values `["S", "M", "L"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub name: String,
    pub values: Vec<String>,
}

/// Summary of one source's run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperResult {
    pub source: String,
    pub products: Vec<NormalizedProduct>,
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ScraperResult {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            products: Vec::new(),
            scraped_at: Utc::now(),
            errors: Vec::new(),
        }
    }

    /// A result carrying a single source-level failure and no products.
    #[must_use]
    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new(source);
        result.errors.push(error.into());
        result
    }

    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

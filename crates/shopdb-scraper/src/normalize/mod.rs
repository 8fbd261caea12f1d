//! Normalization from raw source payloads to [`shopdb_core::NormalizedProduct`].
//!
//! Everything here is pure: no I/O and no panics. Missing optional fields
//! become `None`; only a missing name or a non-positive price drops an item,
//! and that is logged at `debug` because it is expected filtering.

mod attributes;
mod color;
mod json_ld;
mod price;
mod shopify;
mod taxonomy;
mod text;

use shopdb_core::{Condition, Gender, SourceDefinition};

pub use attributes::{color_group_id, extract_material, infer_gender, is_gift_card};
pub use color::{color_hex, color_name, COLOR_TABLE};
pub use json_ld::normalize_json_ld;
pub use price::{parse_price, resolve_price, PricePoint, ResolvedPrice, PRICE_SCALE};
pub use shopify::normalize_shopify;
pub use taxonomy::{infer_category, CATEGORY_RULES, DEFAULT_CATEGORY};

use crate::html::clean_text;
use crate::origin::extract_store_origin;

/// Per-source values the normalizers stamp onto every product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    /// Source name, recorded as `source_platform`.
    pub platform: String,
    pub brand: String,
    pub origin: String,
    pub default_gender: Option<Gender>,
    pub condition: Condition,
}

impl SourceContext {
    #[must_use]
    pub fn from_definition(definition: &SourceDefinition) -> Self {
        Self {
            platform: definition.name.clone(),
            brand: definition.brand.clone(),
            origin: extract_store_origin(&definition.base_url),
            default_gender: definition.default_gender,
            condition: definition.condition,
        }
    }
}

/// Cleaned description, or the product name when the description is empty.
fn description_or_name(raw: Option<&str>, name: &str) -> String {
    let cleaned = raw.map(clean_text).unwrap_or_default();
    if cleaned.is_empty() {
        name.to_owned()
    } else {
        cleaned
    }
}

/// Absolute image URL; protocol-relative CDN links get `https:`.
fn absolute_image(src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        None
    } else if let Some(rest) = src.strip_prefix("//") {
        Some(format!("https://{rest}"))
    } else {
        Some(src.to_owned())
    }
}

/// De-duplicated gallery in first-seen order.
fn gallery<'a>(sources: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in sources.into_iter().filter_map(absolute_image) {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

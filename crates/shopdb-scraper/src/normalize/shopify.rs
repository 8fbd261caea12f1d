use std::collections::HashMap;

use shopdb_core::{NormalizedProduct, ProductOption, Variant};

use super::{
    absolute_image, color_group_id, color_hex, color_name, description_or_name, extract_material,
    gallery, infer_category, infer_gender, is_gift_card, parse_price, resolve_price, PricePoint,
    SourceContext,
};
use crate::types::{ShopifyProduct, ShopifyVariant};

/// Normalizes a Shopify detail payload.
///
/// When `availability` (variant id → in stock, scraped from the product
/// page) is present it overrides the JSON `available` flags; variants it does
/// not mention count as available. Returns `None` for gift cards with
/// nothing in stock, an empty title, or no positive price.
#[must_use]
pub fn normalize_shopify(
    product: &ShopifyProduct,
    availability: Option<&HashMap<String, bool>>,
    ctx: &SourceContext,
) -> Option<NormalizedProduct> {
    let name = product.title.trim().to_owned();
    if name.is_empty() {
        tracing::debug!(
            source = %ctx.platform,
            handle = %product.handle,
            "dropping product with empty title"
        );
        return None;
    }

    let variants: Vec<Variant> = product
        .variants
        .iter()
        .map(|v| normalize_variant(v, availability))
        .collect();
    let any_available = variants.iter().any(|v| v.available);

    let product_type = product.product_type.as_deref().filter(|t| !t.trim().is_empty());
    if is_gift_card(&product.handle, &name, product_type) && !any_available {
        tracing::debug!(
            source = %ctx.platform,
            handle = %product.handle,
            "dropping unavailable gift card"
        );
        return None;
    }

    let points: Vec<PricePoint> = product
        .variants
        .iter()
        .zip(&variants)
        .map(|(raw, merged)| PricePoint {
            price: merged.price,
            compare_at: raw.compare_at_price.as_deref().and_then(parse_price),
            available: merged.available,
        })
        .collect();
    let Some(resolved) = resolve_price(&points) else {
        tracing::debug!(
            source = %ctx.platform,
            handle = %product.handle,
            "dropping product without a positive price"
        );
        return None;
    };

    let options: Vec<ProductOption> = product
        .options
        .iter()
        .filter(|o| !is_placeholder_option(&o.name, &o.values))
        .map(|o| ProductOption {
            name: o.name.trim().to_owned(),
            values: o.values.clone(),
        })
        .collect();

    let image_url = product
        .image
        .as_ref()
        .and_then(|i| absolute_image(&i.src))
        .or_else(|| product.images.first().and_then(|i| absolute_image(&i.src)));
    let mut ordered_images: Vec<_> = product.images.iter().collect();
    ordered_images.sort_by_key(|i| i.position.unwrap_or(i32::MAX));
    let image_urls = gallery(
        image_url
            .as_deref()
            .into_iter()
            .chain(ordered_images.iter().map(|i| i.src.as_str())),
    );

    let color = color_name(&name, &options, &product.handle);
    let category = infer_category(&[
        product_type.unwrap_or_default(),
        name.as_str(),
        product.handle.as_str(),
    ]);

    Some(NormalizedProduct {
        description: description_or_name(product.body_html.as_deref(), &name),
        brand: ctx.brand.clone(),
        price: resolved.price,
        original_price: resolved.original_price,
        material: extract_material(&product.tags),
        category: category.to_owned(),
        gender: Some(infer_gender(&product.tags, &product.handle, ctx.default_gender)),
        condition: ctx.condition,
        source_url: format!("{}/products/{}", ctx.origin.trim_end_matches('/'), product.handle),
        source_platform: ctx.platform.clone(),
        image_url,
        image_urls,
        variants,
        options,
        color_group_id: color_group_id(&product.tags),
        color_hex: color.as_deref().and_then(color_hex).map(str::to_owned),
        color_name: color,
        name,
    })
}

fn normalize_variant(
    variant: &ShopifyVariant,
    availability: Option<&HashMap<String, bool>>,
) -> Variant {
    let id = variant.id.to_string();
    let available = match availability {
        Some(map) => map.get(&id).copied().unwrap_or(true),
        None => variant.available,
    };
    Variant {
        title: variant.title.trim().to_owned(),
        available,
        price: variant.price.as_deref().and_then(parse_price),
        option1: variant.option1.clone(),
        option2: variant.option2.clone(),
        option3: variant.option3.clone(),
        id,
    }
}

/// Shopify's single-variant placeholder: `Title` → `["Default Title"]`.
fn is_placeholder_option(name: &str, values: &[String]) -> bool {
    name.eq_ignore_ascii_case("title")
        && values
            .iter()
            .all(|v| v.eq_ignore_ascii_case("default title"))
}

#[cfg(test)]
#[path = "shopify_test.rs"]
mod tests;

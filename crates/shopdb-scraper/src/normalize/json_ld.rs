use serde_json::Value;
use shopdb_core::{Condition, NormalizedProduct, ProductOption, Variant};

use super::text::title_case;
use super::{
    color_hex, color_name, description_or_name, gallery, infer_category, infer_gender, is_gift_card,
    parse_price, resolve_price, PricePoint, SourceContext,
};
use crate::html::{is_type, json_id};

/// Normalizes a schema.org `Product` node scraped from `url`.
///
/// Variants come from `hasVariant` when present, otherwise one per offer.
/// A `ListPrice`/`StrikethroughPrice` price specification supplies the
/// compare-at price. Returns `None` for a missing name or no positive price.
#[must_use]
pub fn normalize_json_ld(
    url: &str,
    product: &Value,
    ctx: &SourceContext,
) -> Option<NormalizedProduct> {
    let name = str_field(product, "name").unwrap_or_default();
    if name.is_empty() {
        tracing::debug!(source = %ctx.platform, url, "dropping JSON-LD product without a name");
        return None;
    }

    let mut points = Vec::new();
    let mut variants = Vec::new();
    let has_variants = as_list(product.get("hasVariant"));
    if has_variants.is_empty() {
        for (idx, offer) in as_list(product.get("offers")).into_iter().enumerate() {
            let point = offer_point(offer);
            variants.push(Variant {
                id: str_field(offer, "sku")
                    .or_else(|| offer.get("@id").and_then(json_id))
                    .unwrap_or_else(|| idx.to_string()),
                title: str_field(offer, "name").unwrap_or_else(|| name.clone()),
                available: point.available,
                price: point.price,
                option1: None,
                option2: None,
                option3: None,
            });
            points.push(point);
        }
    } else {
        for (idx, node) in has_variants.into_iter().enumerate() {
            let offer = as_list(node.get("offers")).into_iter().next();
            let point = offer.map_or(
                PricePoint {
                    price: None,
                    compare_at: None,
                    available: true,
                },
                offer_point,
            );
            variants.push(Variant {
                id: str_field(node, "sku")
                    .or_else(|| node.get("productID").and_then(json_id))
                    .or_else(|| node.get("@id").and_then(json_id))
                    .unwrap_or_else(|| idx.to_string()),
                title: str_field(node, "name").unwrap_or_else(|| name.clone()),
                available: point.available,
                price: point.price,
                option1: str_field(node, "size"),
                option2: str_field(node, "color"),
                option3: str_field(node, "material"),
            });
            points.push(point);
        }
    }

    let path = url_path(url);
    if is_gift_card(path, &name, None) && !variants.iter().any(|v| v.available) {
        tracing::debug!(source = %ctx.platform, url, "dropping unavailable gift card");
        return None;
    }

    let Some(resolved) = resolve_price(&points) else {
        tracing::debug!(
            source = %ctx.platform,
            url,
            "dropping JSON-LD product without a positive price"
        );
        return None;
    };

    let options = variant_options(&variants);
    let images = image_list(product.get("image"));
    let image_urls = gallery(images.iter().map(String::as_str));

    let color = str_field(product, "color").or_else(|| color_name(&name, &options, path));
    let category_hint = str_field(product, "category").unwrap_or_default();
    let audience = product
        .get("audience")
        .and_then(|a| str_field(a, "suggestedGender"))
        .into_iter()
        .collect::<Vec<_>>();

    Some(NormalizedProduct {
        description: description_or_name(product.get("description").and_then(Value::as_str), &name),
        brand: brand_name(product.get("brand")).unwrap_or_else(|| ctx.brand.clone()),
        price: resolved.price,
        original_price: resolved.original_price,
        material: str_field(product, "material").map(|m| title_case(&m)),
        category: infer_category(&[category_hint.as_str(), name.as_str(), path]).to_owned(),
        gender: Some(infer_gender(&audience, path, ctx.default_gender)),
        condition: offer_condition(product).unwrap_or(ctx.condition),
        source_url: url.to_owned(),
        source_platform: ctx.platform.clone(),
        image_url: image_urls.first().cloned(),
        image_urls,
        variants,
        options,
        color_group_id: str_field(product, "inProductGroupWithID")
            .or_else(|| str_field(product, "productGroupID")),
        color_hex: color.as_deref().and_then(color_hex).map(str::to_owned),
        color_name: color,
        name,
    })
}

fn str_field(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

fn number_field(node: &Value, key: &str) -> Option<rust_decimal::Decimal> {
    match node.get(key)? {
        Value::String(s) => parse_price(s),
        Value::Number(n) => parse_price(&n.to_string()),
        _ => None,
    }
}

/// Price, compare-at and availability of one `Offer` or `AggregateOffer`.
fn offer_point(offer: &Value) -> PricePoint {
    let price = number_field(offer, "price")
        .or_else(|| number_field(offer, "lowPrice"))
        .or_else(|| {
            as_list(offer.get("priceSpecification"))
                .into_iter()
                .filter(|spec| !is_list_price(spec))
                .find_map(|spec| number_field(spec, "price"))
        });
    let compare_at = as_list(offer.get("priceSpecification"))
        .into_iter()
        .filter(|spec| is_list_price(spec))
        .find_map(|spec| number_field(spec, "price"));
    let available = offer
        .get("availability")
        .and_then(Value::as_str)
        .is_none_or(|a| {
            let a = a.to_lowercase();
            a.ends_with("instock") || a.ends_with("limitedavailability") || a.ends_with("preorder")
                || a.ends_with("onlineonly") || a.ends_with("instoreonly")
        });
    PricePoint {
        price,
        compare_at,
        available,
    }
}

fn is_list_price(spec: &Value) -> bool {
    spec.get("priceType")
        .and_then(Value::as_str)
        .is_some_and(|t| {
            let t = t.to_lowercase();
            t.ends_with("listprice") || t.ends_with("strikethroughprice")
        })
}

fn offer_condition(product: &Value) -> Option<Condition> {
    let raw = as_list(product.get("offers"))
        .into_iter()
        .find_map(|offer| offer.get("itemCondition").and_then(Value::as_str))
        .or_else(|| product.get("itemCondition").and_then(Value::as_str))?
        .to_lowercase();
    if raw.ends_with("newcondition") {
        Some(Condition::New)
    } else if raw.ends_with("refurbishedcondition") {
        Some(Condition::LikeNew)
    } else if raw.ends_with("usedcondition") || raw.ends_with("damagedcondition") {
        Some(Condition::Used)
    } else {
        None
    }
}

fn brand_name(brand: Option<&Value>) -> Option<String> {
    match brand? {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        node @ Value::Object(_) => str_field(node, "name"),
        Value::Array(items) => items.iter().find_map(|b| brand_name(Some(b))),
        _ => None,
    }
}

/// Image URLs from a string, `ImageObject`, or a list of either.
fn image_list(image: Option<&Value>) -> Vec<String> {
    as_list(image)
        .into_iter()
        .filter_map(|img| match img {
            Value::String(s) => Some(s.clone()),
            node @ Value::Object(_)
                if is_type(node.get("@type"), "imageobject") || node.get("url").is_some() =>
            {
                str_field(node, "url").or_else(|| str_field(node, "contentUrl"))
            }
            _ => None,
        })
        .collect()
}

/// Size / Color / Material options collected from variant attributes.
fn variant_options(variants: &[Variant]) -> Vec<ProductOption> {
    let mut options = Vec::new();
    for (label, pick) in [
        ("Size", (|v: &Variant| v.option1.clone()) as fn(&Variant) -> Option<String>),
        ("Color", |v: &Variant| v.option2.clone()),
        ("Material", |v: &Variant| v.option3.clone()),
    ] {
        let mut values: Vec<String> = Vec::new();
        for value in variants.iter().filter_map(pick) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        if !values.is_empty() {
            options.push(ProductOption {
                name: label.to_owned(),
                values,
            });
        }
    }
    options
}

fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .find('/')
        .map_or("", |idx| &without_scheme[idx..])
}

#[cfg(test)]
#[path = "json_ld_test.rs"]
mod tests;

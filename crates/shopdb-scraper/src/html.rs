//! HTML and XML extraction: text cleanup, sitemap `<loc>` entries, links,
//! inline variant availability, and schema.org `Product` nodes.
//!
//! Sitemaps are real XML and go through `quick_xml`; storefront HTML is
//! rarely well-formed, so it is scanned with regexes.

use std::collections::HashMap;
use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde_json::Value;

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));
static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid script/style regex")
});
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x?)([0-9a-fA-F]+);").expect("valid entity regex"));
static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)href\s*=\s*["']([^"']+)["']"#).expect("valid href regex"));
static JSON_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/json["'][^>]*>(.*?)</script>"#)
        .expect("valid json script regex")
});
static LD_JSON_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid json-ld script regex")
});
static ID_AVAILABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""id"\s*:\s*"?(\d+)"?\s*,[^{}\[\]]*?"available"\s*:\s*(true|false)"#)
        .expect("valid availability regex")
});

/// Strips tags (dropping `<script>`/`<style>` bodies), decodes common
/// entities, and collapses whitespace.
#[must_use]
pub fn clean_text(input: &str) -> String {
    let no_scripts = SCRIPT_STYLE.replace_all(input, " ");
    let no_tags = TAGS.replace_all(&no_scripts, " ");
    decode_entities(&no_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(input: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(input, |cap: &regex::Captures<'_>| {
        let radix = if cap[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&cap[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| cap[0].to_string(), |c| c.to_string())
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// `<loc>` values from a sitemap or sitemap index, text or CDATA.
///
/// Parsing stops at the first XML error; entries read before it are kept.
#[must_use]
pub fn sitemap_locs(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => {
                in_loc = true;
                current.clear();
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    locs.push(loc.to_string());
                }
            }
            Ok(Event::Text(e)) if in_loc => {
                current.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::CData(e)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    position = reader.buffer_position(),
                    parsed = locs.len(),
                    "malformed sitemap XML; keeping entries read so far"
                );
                break;
            }
            _ => {}
        }
    }

    locs
}

/// Raw `href` attribute values, excluding fragments and non-HTTP schemes.
#[must_use]
pub fn extract_links(html: &str) -> Vec<String> {
    HREF.captures_iter(html)
        .filter_map(|cap| cap.get(1).map(|m| decode_entities(m.as_str().trim())))
        .filter(|href| {
            !href.is_empty()
                && !href.starts_with('#')
                && !href.starts_with("mailto:")
                && !href.starts_with("javascript:")
                && !href.starts_with("tel:")
        })
        .collect()
}

/// Variant id → availability, read from the product page's inline JSON.
///
/// Structured `application/json` script blocks are walked first; when none
/// yields a variant, adjacent `"id"`/`"available"` pairs anywhere in the page
/// are used. Returns `None` when the page exposes no availability at all.
#[must_use]
pub fn parse_variant_availability(html: &str) -> Option<HashMap<String, bool>> {
    let mut map = HashMap::new();

    for cap in JSON_SCRIPT.captures_iter(html) {
        let raw = cap.get(1).map_or("", |m| m.as_str()).trim();
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            collect_availability(&value, &mut map);
        }
    }

    if map.is_empty() {
        for cap in ID_AVAILABLE.captures_iter(html) {
            map.entry(cap[1].to_string())
                .or_insert_with(|| &cap[2] == "true");
        }
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn collect_availability(value: &Value, out: &mut HashMap<String, bool>) {
    match value {
        Value::Object(map) => {
            if let (Some(id), Some(available)) = (
                map.get("id").and_then(json_id),
                map.get("available").and_then(Value::as_bool),
            ) {
                out.entry(id).or_insert(available);
            }
            for child in map.values() {
                collect_availability(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_availability(child, out);
            }
        }
        _ => {}
    }
}

/// Numeric or string JSON id as a string.
pub(crate) fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// The first schema.org `Product` node in the page's JSON-LD blocks,
/// searching `@graph` containers and nested arrays.
#[must_use]
pub fn extract_json_ld_product(html: &str) -> Option<Value> {
    LD_JSON_SCRIPT.captures_iter(html).find_map(|cap| {
        let raw = cap.get(1).map_or("", |m| m.as_str()).trim();
        let value = serde_json::from_str::<Value>(raw).ok()?;
        find_product_node(&value).cloned()
    })
}

fn find_product_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if is_type(map.get("@type"), "product") {
                return Some(value);
            }
            map.values().find_map(find_product_node)
        }
        Value::Array(items) => items.iter().find_map(find_product_node),
        _ => None,
    }
}

/// Whether a JSON-LD `@type` (string or array) names `wanted`,
/// case-insensitively and ignoring a schema.org prefix.
pub(crate) fn is_type(node_type: Option<&Value>, wanted: &str) -> bool {
    let matches = |s: &str| {
        s.rsplit('/')
            .next()
            .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
    };
    match node_type {
        Some(Value::String(s)) => matches(s),
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

#[cfg(test)]
#[path = "html_test.rs"]
mod tests;

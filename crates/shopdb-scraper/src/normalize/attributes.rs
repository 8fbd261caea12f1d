use shopdb_core::Gender;

use super::text::{contains_whole_word, contains_word, searchable, title_case};

const WOMEN_WORDS: &[&str] = &["women", "womens", "woman", "ladies", "female"];
const MEN_WORDS: &[&str] = &["men", "mens", "man", "male"];

/// Gender from tags, then from the handle. Women's markers are checked
/// before men's in each field. Falls back to `default`, then unisex.
#[must_use]
pub fn infer_gender(tags: &[String], handle: &str, default: Option<Gender>) -> Gender {
    let tag_text = searchable(&tags.join(" "));
    if let Some(gender) = gender_in(&tag_text) {
        return gender;
    }
    if let Some(gender) = gender_in(&searchable(handle)) {
        return gender;
    }
    default.unwrap_or(Gender::Unisex)
}

fn gender_in(text: &str) -> Option<Gender> {
    if WOMEN_WORDS.iter().any(|w| contains_whole_word(text, w)) {
        Some(Gender::Women)
    } else if MEN_WORDS.iter().any(|w| contains_whole_word(text, w)) {
        Some(Gender::Men)
    } else if contains_whole_word(text, "unisex") {
        Some(Gender::Unisex)
    } else {
        None
    }
}

/// Title-cased remainder of the first `fabric:` tag.
#[must_use]
pub fn extract_material(tags: &[String]) -> Option<String> {
    prefixed_tag(tags, "fabric:").map(|rest| title_case(&rest.replace(['-', '_'], " ")))
}

/// Group id linking colourways listed as separate products, from a
/// `ygroup_` tag (`YGroup_crew-neck` → `crew-neck`).
#[must_use]
pub fn color_group_id(tags: &[String]) -> Option<String> {
    prefixed_tag(tags, "ygroup_").map(str::to_owned)
}

fn prefixed_tag<'t>(tags: &'t [String], prefix: &str) -> Option<&'t str> {
    tags.iter().find_map(|tag| {
        let tag = tag.trim();
        let head = tag.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        let rest = tag[prefix.len()..].trim();
        (!rest.is_empty()).then_some(rest)
    })
}

/// Whether handle, title or product type marks a gift card.
#[must_use]
pub fn is_gift_card(handle: &str, title: &str, product_type: Option<&str>) -> bool {
    [handle, title, product_type.unwrap_or_default()]
        .iter()
        .any(|field| {
            let text = searchable(field);
            contains_word(&text, "gift card")
                || contains_word(&text, "giftcard")
                || contains_word(&text, "e gift")
        })
}

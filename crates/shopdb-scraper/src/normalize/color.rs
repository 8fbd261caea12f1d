use shopdb_core::ProductOption;

use super::text::{longest_match, searchable, title_case};

/// Colour name → swatch hex. Lookups pick the longest name that starts a
/// word in the input, so `"charcoal"` beats `"grey"` and `"navy blue"` beats
/// `"blue"`.
pub const COLOR_TABLE: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("white", "#FFFFFF"),
    ("off white", "#F5F3EE"),
    ("ivory", "#FFFFF0"),
    ("cream", "#FFFDD0"),
    ("bone", "#E3DAC9"),
    ("ecru", "#C2B280"),
    ("natural", "#EFE7D6"),
    ("oatmeal", "#D8CBB5"),
    ("beige", "#F5F5DC"),
    ("sand", "#C2B280"),
    ("khaki", "#C3B091"),
    ("tan", "#D2B48C"),
    ("camel", "#C19A6B"),
    ("brown", "#8B4513"),
    ("chocolate", "#7B3F00"),
    ("espresso", "#4B3621"),
    ("rust", "#B7410E"),
    ("grey", "#808080"),
    ("gray", "#808080"),
    ("light grey", "#D3D3D3"),
    ("charcoal", "#36454F"),
    ("slate", "#708090"),
    ("silver", "#C0C0C0"),
    ("navy", "#000080"),
    ("navy blue", "#000080"),
    ("blue", "#0000FF"),
    ("light blue", "#ADD8E6"),
    ("sky blue", "#87CEEB"),
    ("indigo", "#4B0082"),
    ("denim", "#1560BD"),
    ("teal", "#008080"),
    ("turquoise", "#40E0D0"),
    ("green", "#008000"),
    ("olive", "#808000"),
    ("sage", "#B2AC88"),
    ("forest green", "#228B22"),
    ("mint", "#98FF98"),
    ("red", "#FF0000"),
    ("burgundy", "#800020"),
    ("maroon", "#800000"),
    ("wine", "#722F37"),
    ("pink", "#FFC0CB"),
    ("blush", "#DE5D83"),
    ("dusty rose", "#DCAE96"),
    ("rose", "#FF007F"),
    ("coral", "#FF7F50"),
    ("orange", "#FFA500"),
    ("terracotta", "#E2725B"),
    ("yellow", "#FFFF00"),
    ("mustard", "#FFDB58"),
    ("gold", "#FFD700"),
    ("purple", "#800080"),
    ("lavender", "#E6E6FA"),
    ("lilac", "#C8A2C8"),
    ("plum", "#8E4585"),
];

/// Title separators that introduce a colour suffix, e.g.
/// `"Organic Crew - Heather Grey"`.
const TITLE_SEPARATORS: &[&str] = &[" - ", " / ", " | ", " \u{2013} "];

/// Display colour name, from (in order) a title suffix, a `Color`/`Colour`
/// option, or the longest colour-table name found in the handle.
#[must_use]
pub fn color_name(title: &str, options: &[ProductOption], handle: &str) -> Option<String> {
    if let Some(suffix) = title_suffix(title) {
        return Some(suffix.to_owned());
    }

    if let Some(value) = options
        .iter()
        .find(|o| {
            let name = o.name.trim().to_lowercase();
            name == "color" || name == "colour"
        })
        .and_then(|o| o.values.first())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
    {
        return Some(value.to_owned());
    }

    let text = searchable(handle);
    longest_match(&text, COLOR_TABLE.iter().map(|(name, _)| *name)).map(title_case)
}

/// Swatch hex for a colour name, by longest table-name match.
#[must_use]
pub fn color_hex(name: &str) -> Option<&'static str> {
    let text = searchable(name);
    let matched = longest_match(&text, COLOR_TABLE.iter().map(|(name, _)| *name))?;
    COLOR_TABLE
        .iter()
        .find(|(name, _)| *name == matched)
        .map(|(_, hex)| *hex)
}

fn title_suffix(title: &str) -> Option<&str> {
    TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| title.rfind(sep).map(|idx| &title[idx + sep.len()..]))
        .map(str::trim)
        .find(|suffix| !suffix.is_empty() && suffix.split_whitespace().count() <= 4)
}

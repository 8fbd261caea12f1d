use super::text::{longest_match, searchable};

/// Fallback when no rule matches.
pub const DEFAULT_CATEGORY: &str = "other";

/// Ordered (category, keywords) rules; the first rule with a matching keyword
/// wins. Rules that would otherwise be shadowed by a shorter, more generic
/// keyword come first: `"sports bra"` is activewear before `"bra"` is
/// underwear, `"jacket"` is outerwear before `"denim"` is jeans.
pub const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "activewear",
        &[
            "sports bra", "legging", "bike short", "running short", "track pant", "sweatpant",
            "jogger", "tights",
        ],
    ),
    (
        "swimwear",
        &["swimsuit", "swim trunk", "boardshort", "rash guard", "one piece", "bikini", "swim"],
    ),
    (
        "underwear",
        &["boxer brief", "underwear", "undershirt", "bralette", "boxer", "brief", "thong", "bra"],
    ),
    ("socks", &["socks", "sock"]),
    ("loungewear", &["sleepwear", "pajama", "pyjama", "lounge", "robe"]),
    (
        "outerwear",
        &[
            "windbreaker", "overcoat", "raincoat", "topcoat", "anorak", "blazer", "jacket", "parka",
            "puffer", "trench", "fleece", "shacket", "coat", "vest",
        ],
    ),
    (
        "sweaters",
        &[
            "quarter zip", "sweatshirt", "half zip", "cardigan", "pullover", "sweater", "hoodie",
            "hoody",
        ],
    ),
    ("dresses", &["jumpsuit", "romper", "dress"]),
    ("skirts", &["skirt", "skort"]),
    (
        "tops",
        &[
            "button down", "turtleneck", "bodysuit", "t shirt", "henley", "blouse", "shirt", "polo",
            "tank", "cami", "tee", "top",
        ],
    ),
    ("jeans", &["denim", "jeans", "jean"]),
    ("shorts", &["shorts"]),
    ("pants", &["trousers", "chinos", "slacks", "chino", "pants", "pant"]),
    (
        "shoes",
        &["sneaker", "loafer", "sandal", "slipper", "boot", "shoe", "clog", "mule"],
    ),
    (
        "bags",
        &["crossbody", "backpack", "duffel", "duffle", "wallet", "pouch", "tote", "bag"],
    ),
    (
        "accessories",
        &[
            "sunglasses", "bandana", "beanie", "glove", "scarf", "belt", "hat", "cap", "tie",
        ],
    ),
];

/// Maps free text onto the fixed category set.
///
/// `fields` are tried in order (product type, then title, then handle is the
/// usual order); within a field the rules are evaluated in
/// [`CATEGORY_RULES`] order and, within a rule, keywords longest-first.
#[must_use]
pub fn infer_category(fields: &[&str]) -> &'static str {
    fields
        .iter()
        .filter(|f| !f.trim().is_empty())
        .find_map(|field| category_for(&searchable(field)))
        .unwrap_or(DEFAULT_CATEGORY)
}

fn category_for(text: &str) -> Option<&'static str> {
    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| longest_match(text, keywords.iter().copied()).is_some())
        .map(|(category, _)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hoodie_handle_is_a_sweater() {
        assert_eq!(infer_category(&["heather-grey-charcoal-hoodie"]), "sweaters");
    }

    #[test]
    fn earlier_rule_wins_over_generic_keyword() {
        assert_eq!(infer_category(&["Seamless Sports Bra"]), "activewear");
        assert_eq!(infer_category(&["Lace Bralette"]), "underwear");
        assert_eq!(infer_category(&["Selvedge Denim Jacket"]), "outerwear");
        assert_eq!(infer_category(&["Slim Denim"]), "jeans");
    }

    #[test]
    fn short_sleeve_tee_is_not_shorts() {
        assert_eq!(infer_category(&["Short Sleeve Organic Tee"]), "tops");
    }

    #[test]
    fn keywords_match_word_starts_only() {
        // "coat" must not fire inside "charcoal", "tee" not inside "steel"
        assert_eq!(infer_category(&["charcoal steel"]), DEFAULT_CATEGORY);
    }

    #[test]
    fn fields_are_tried_in_order() {
        assert_eq!(infer_category(&["", "Merino Cardigan", "linen-shirt"]), "sweaters");
        assert_eq!(infer_category(&["Gift", "Card", "classic-tee"]), "tops");
    }

    #[test]
    fn every_rule_has_keywords() {
        for (category, keywords) in CATEGORY_RULES {
            assert!(!keywords.is_empty(), "{category} has no keywords");
        }
    }
}

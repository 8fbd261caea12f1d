//! Keyword matching over handles, titles and tags.
//!
//! Text is lower-cased, separators (`-`, `_`, `/`, punctuation) become
//! spaces, and a keyword only matches where a word starts. `"coal"` therefore
//! never matches inside `"charcoal"`, nor `"men"` inside `"women"`.

/// Lower-cased, space-separated form of `input` with a leading space, ready
/// for [`contains_word`].
#[must_use]
pub fn searchable(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 1);
    out.push(' ');
    let mut last_space = true;
    for c in input.chars() {
        if c.is_alphanumeric() || c == '\'' {
            if c != '\'' {
                out.extend(c.to_lowercase());
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out
}

/// Whether `keyword` (already lower-case, space-separated) begins a word in
/// the [`searchable`] text.
#[must_use]
pub fn contains_word(haystack: &str, keyword: &str) -> bool {
    let mut needle = String::with_capacity(keyword.len() + 1);
    needle.push(' ');
    needle.push_str(keyword);
    haystack.contains(&needle)
}

/// Whether `word` appears as a complete word in the [`searchable`] text.
#[must_use]
pub fn contains_whole_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(' ')
        .any(|token| !token.is_empty() && token == word)
}

/// The longest keyword that begins a word in `haystack`.
#[must_use]
pub fn longest_match<'k>(
    haystack: &str,
    keywords: impl IntoIterator<Item = &'k str>,
) -> Option<&'k str> {
    keywords
        .into_iter()
        .filter(|k| contains_word(haystack, k))
        .max_by_key(|k| k.len())
}

/// `"organic cotton"` → `"Organic Cotton"`.
#[must_use]
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

//! URL helpers: origin and domain extraction, link resolution, and
//! discovery URL templates.

/// Extracts the scheme+host origin from a storefront URL.
///
/// Given `"https://kotn.com/collections/all"`, returns `"https://kotn.com"`.
#[must_use]
pub fn extract_store_origin(base_url: &str) -> String {
    reqwest::Url::parse(base_url).map_or_else(
        |e| {
            tracing::warn!(
                base_url,
                error = %e,
                "could not parse base_url; falling back to string split for origin"
            );
            base_url
                .trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

/// Hostname of `url`, or the whole string when it does not parse.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Resolves `link` (absolute, protocol-relative, or root-relative) against
/// `origin`. Returns `None` for links that cannot be joined.
#[must_use]
pub fn resolve_url(origin: &str, link: &str) -> Option<String> {
    let base = reqwest::Url::parse(origin).ok()?;
    base.join(link.trim()).ok().map(|u| u.to_string())
}

/// Substitutes `{origin}`, `{collection}` and `{page}` in a discovery URL
/// template.
#[must_use]
pub fn fill_template(
    template: &str,
    origin: &str,
    collection: Option<&str>,
    page: usize,
) -> String {
    let filled = template
        .replace("{origin}", origin.trim_end_matches('/'))
        .replace("{page}", &page.to_string());
    match collection {
        Some(collection) => filled.replace("{collection}", collection),
        None => filled,
    }
}

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::products::{Condition, Gender};
use crate::ConfigError;

/// Which adapter family handles a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Shopify storefront: `products/{handle}.json` detail payloads.
    Shopify,
    /// Any storefront exposing a schema.org `Product` node in its HTML.
    JsonLd,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterKind::Shopify => write!(f, "shopify"),
            AdapterKind::JsonLd => write!(f, "json_ld"),
        }
    }
}

/// Command-line flags that can never name a source.
pub const RESERVED_SOURCE_NAMES: &[&str] = &["all", "max", "dry-run", "help", "version"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryConfig {
    Sitemap(SitemapDiscovery),
    Category(CategoryDiscovery),
}

/// Sitemap crawl. `url_template` may contain `{origin}` and `{page}`; when
/// `{page}` is present pages are requested from 1 upward until one yields no
/// new item links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapDiscovery {
    #[serde(default = "default_sitemap_template")]
    pub url_template: String,
    /// Regex with one capture group yielding the item handle.
    #[serde(default = "default_item_pattern")]
    pub item_pattern: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFormat {
    /// Shopify-style `{"products": [{"handle": ...}]}` listing.
    #[default]
    Json,
    /// Rendered HTML page; handles are pulled out of links.
    Html,
}

/// Category-page crawl. `url_template` may contain `{origin}`,
/// `{collection}` and `{page}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDiscovery {
    pub url_template: String,
    pub collections: Vec<String>,
    #[serde(default)]
    pub format: CategoryFormat,
    #[serde(default = "default_item_pattern")]
    pub item_pattern: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Command-line flag name, e.g. `kotn` for `--kotn`.
    pub name: String,
    pub brand: String,
    pub base_url: String,
    pub adapter: AdapterKind,
    /// Written as a one-key map, `sitemap: {...}` or `category: {...}`.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub default_gender: Option<Gender>,
    #[serde(default)]
    pub condition: Condition,
    /// Shopify only: scrape live variant availability from the product page.
    #[serde(default)]
    pub html_availability: bool,
    /// Marks the source used when no source flag is given.
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceDefinition>,
}

impl SourcesFile {
    /// The source to run when none is requested: the one flagged `default`,
    /// otherwise the first listed.
    #[must_use]
    pub fn default_source(&self) -> Option<&SourceDefinition> {
        self.sources
            .iter()
            .find(|s| s.default)
            .or_else(|| self.sources.first())
    }
}

fn default_sitemap_template() -> String {
    "{origin}/sitemap_products_{page}.xml".to_string()
}

fn default_item_pattern() -> String {
    r"/products/([A-Za-z0-9][A-Za-z0-9_\-]*)".to_string()
}

fn default_max_pages() -> usize {
    20
}

/// Load and validate source definitions from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources(&content)
}

/// Parse and validate source definitions from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_sources(content: &str) -> Result<SourcesFile, ConfigError> {
    let sources_file: SourcesFile = serde_yaml::from_str(content)?;
    validate_sources(&sources_file)?;
    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut defaults = 0usize;

    for source in &sources_file.sources {
        let name = source.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }
        if RESERVED_SOURCE_NAMES.contains(&name) {
            return Err(ConfigError::Validation(format!(
                "source name '{name}' collides with a built-in flag"
            )));
        }
        if !seen_names.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name: '{name}'"
            )));
        }
        if source.brand.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{name}' has an empty brand"
            )));
        }
        if !(source.base_url.starts_with("https://") || source.base_url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "source '{name}' base_url must be an http(s) URL, got '{}'",
                source.base_url
            )));
        }
        if let DiscoveryConfig::Category(category) = &source.discovery {
            if category.collections.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source '{name}' uses category discovery with no collections"
                )));
            }
        }
        if source.default {
            defaults += 1;
        }
    }

    if defaults > 1 {
        return Err(ConfigError::Validation(format!(
            "{defaults} sources are marked default; at most one is allowed"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;

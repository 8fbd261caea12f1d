//! Source name → adapter lookup.
//!
//! The registry is the single place where a configured source turns into a
//! runnable [`Adapter`]; everything downstream only sees the trait object.

use shopdb_core::{AdapterKind, SourceDefinition, SourcesFile};

use crate::adapter::{Adapter, JsonLdAdapter, ShopifyAdapter};

/// Registered adapters in registration order, plus the default source name.
pub struct SourceRegistry {
    adapters: Vec<Box<dyn Adapter>>,
    default: Option<String>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .field("default", &self.default)
            .finish()
    }
}

impl SourceRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
            default: None,
        }
    }

    /// Builds one adapter per definition, in file order.
    #[must_use]
    pub fn from_sources(sources: &SourcesFile) -> Self {
        let mut registry = Self::empty();
        for definition in &sources.sources {
            registry.register(adapter_for(definition));
        }
        registry.default = sources.default_source().map(|d| d.name.clone());
        registry
    }

    /// Adds `adapter`, replacing any adapter already registered under the
    /// same name. The first registered source becomes the default unless one
    /// was set explicitly.
    pub fn register(&mut self, adapter: Box<dyn Adapter>) {
        let name = adapter.name().to_owned();
        if let Some(slot) = self.adapters.iter_mut().find(|a| a.name() == name) {
            tracing::warn!(source = %name, "replacing previously registered adapter");
            *slot = adapter;
            return;
        }
        if self.default.is_none() {
            self.default = Some(name);
        }
        self.adapters.push(adapter);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Adapter> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(AsRef::as_ref)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All registered source names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    #[must_use]
    pub fn default_source(&self) -> Option<&str> {
        self.default.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

fn adapter_for(definition: &SourceDefinition) -> Box<dyn Adapter> {
    match definition.adapter {
        AdapterKind::Shopify => Box::new(ShopifyAdapter::new(definition)),
        AdapterKind::JsonLd => Box::new(JsonLdAdapter::new(definition)),
    }
}

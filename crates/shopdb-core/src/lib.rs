pub mod app_config;
pub mod config;
pub mod products;
pub mod sources;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{
    Condition, Gender, NormalizedProduct, ProductOption, ScraperResult, Variant,
};
pub use sources::{
    load_sources, parse_sources, AdapterKind, CategoryDiscovery, CategoryFormat, DiscoveryConfig,
    SitemapDiscovery, SourceDefinition, SourcesFile, RESERVED_SOURCE_NAMES,
};
pub use store::{ProductStore, UpsertAction, UpsertOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("sources validation failed: {0}")]
    Validation(String),
}

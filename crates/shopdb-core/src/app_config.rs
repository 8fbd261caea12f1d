use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Store endpoint. Only required when the run actually imports.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_initial_concurrency: usize,
    pub scraper_min_concurrency: usize,
    pub scraper_max_retries: u32,
    pub scraper_jitter_max_ms: u64,
    pub scraper_penalty_delay_ms: u64,
    pub import_batch_size: usize,
    pub import_progress_every: usize,
    pub run_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Returns the store endpoint, or an error naming the missing variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field(
                "scraper_initial_concurrency",
                &self.scraper_initial_concurrency,
            )
            .field("scraper_min_concurrency", &self.scraper_min_concurrency)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field("scraper_jitter_max_ms", &self.scraper_jitter_max_ms)
            .field("scraper_penalty_delay_ms", &self.scraper_penalty_delay_ms)
            .field("import_batch_size", &self.import_batch_size)
            .field("import_progress_every", &self.import_progress_every)
            .field("run_timeout_secs", &self.run_timeout_secs)
            .finish()
    }
}

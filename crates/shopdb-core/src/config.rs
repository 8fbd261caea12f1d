use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`
/// lookup instead of `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        match raw.parse::<usize>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            }),
            Ok(value) => Ok(value),
            Err(e) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    let database_url = lookup("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());

    let env = parse_environment(&or_default("SHOPDB_ENV", "development"));
    let log_level = or_default("SHOPDB_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("SHOPDB_SOURCES_PATH", "./config/sources.yaml"));

    let db_max_connections = parse_u32("SHOPDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SHOPDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SHOPDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs = parse_u64("SHOPDB_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_initial_concurrency = parse_positive("SHOPDB_SCRAPER_INITIAL_CONCURRENCY", "5")?;
    let scraper_min_concurrency = parse_positive("SHOPDB_SCRAPER_MIN_CONCURRENCY", "2")?;
    if scraper_min_concurrency > scraper_initial_concurrency {
        return Err(ConfigError::InvalidEnvVar {
            var: "SHOPDB_SCRAPER_MIN_CONCURRENCY".to_string(),
            reason: format!(
                "{scraper_min_concurrency} exceeds initial concurrency {scraper_initial_concurrency}"
            ),
        });
    }
    let scraper_max_retries = parse_u32("SHOPDB_SCRAPER_MAX_RETRIES", "3")?;
    let scraper_jitter_max_ms = parse_u64("SHOPDB_SCRAPER_JITTER_MAX_MS", "400")?;
    let scraper_penalty_delay_ms = parse_u64("SHOPDB_SCRAPER_PENALTY_DELAY_MS", "3000")?;

    let import_batch_size = parse_positive("SHOPDB_IMPORT_BATCH_SIZE", "20")?;
    let import_progress_every = parse_positive("SHOPDB_IMPORT_PROGRESS_EVERY", "100")?;

    let run_timeout_secs = match lookup("SHOPDB_RUN_TIMEOUT_SECS") {
        Ok(raw) => Some(raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: "SHOPDB_RUN_TIMEOUT_SECS".to_string(),
            reason: e.to_string(),
        })?),
        Err(_) => None,
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_initial_concurrency,
        scraper_min_concurrency,
        scraper_max_retries,
        scraper_jitter_max_ms,
        scraper_penalty_delay_ms,
        import_batch_size,
        import_progress_every,
        run_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

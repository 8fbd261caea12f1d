mod args;
mod import;
mod summary;

use std::time::Duration;

use anyhow::Context;
use shopdb_core::AppConfig;
use shopdb_db::{PgProductStore, PoolConfig};
use shopdb_scraper::{FetchPolicy, HttpFetcher, Orchestrator, SourceRegistry};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::args::Invocation;
use crate::import::{dedup_by_source_url, ImportOptions, Importer};
use crate::summary::RunSummary;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let invocation = match Invocation::parse_from(std::env::args()) {
        Ok(invocation) => invocation,
        Err(e) => e.exit(),
    };

    let config = shopdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let sources = shopdb_core::load_sources(&config.sources_path)
        .with_context(|| format!("loading {}", config.sources_path.display()))?;
    let registry = SourceRegistry::from_sources(&sources);
    let selected = invocation.resolve_sources(&registry);
    let dry_run = invocation.cli.dry_run;

    tracing::info!(
        sources = ?selected,
        max = invocation.cli.max,
        dry_run,
        env = %config.env,
        "starting run"
    );

    // Reach the store before scraping so an unreachable database fails fast.
    let store = if dry_run {
        None
    } else {
        Some(connect_store(&config).await?)
    };

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());
    let scrape_cancel = cancel.child_token();
    if let Some(secs) = config.run_timeout_secs {
        spawn_run_timeout(scrape_cancel.clone(), Duration::from_secs(secs));
    }

    let http = HttpFetcher::new(FetchPolicy::from_app_config(&config), scrape_cancel)
        .context("failed to build HTTP client")?;
    let outcome = Orchestrator::new(&registry, http)
        .run(&selected, invocation.cli.max)
        .await;

    let products = outcome.products();
    let import = match &store {
        Some(store) => {
            let importer = Importer::new(
                store,
                ImportOptions::from_app_config(&config),
                cancel.clone(),
            );
            Some(importer.import(products.iter().copied()).await)
        }
        None => None,
    };
    let unique_products = import.map_or_else(
        || dedup_by_source_url(products.iter().copied()).0.len(),
        |summary| products.len() - summary.duplicates,
    );

    println!("{}", RunSummary::new(&outcome, unique_products, import));
    Ok(())
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<PgProductStore> {
    let database_url = config.require_database_url()?;
    let pool = shopdb_db::connect_pool(database_url, PoolConfig::from_app_config(config))
        .await
        .context("cannot reach the product store")?;
    shopdb_db::ping(&pool)
        .await
        .context("product store did not answer a ping")?;
    let applied = shopdb_db::run_migrations(&pool)
        .await
        .context("failed to apply migrations")?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }
    Ok(PgProductStore::new(pool))
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("ctrl-c received; finishing in-flight batches and stopping");
                cancel.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
        }
    });
}

fn spawn_run_timeout(cancel: CancellationToken, after: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(after) => {
                tracing::warn!(
                    timeout_secs = after.as_secs(),
                    "run timeout reached; stopping scrape"
                );
                cancel.cancel();
            }
            () = cancel.cancelled() => {}
        }
    });
}

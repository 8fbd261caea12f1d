//! Command-line handling.
//!
//! Built-in flags go through clap. Every other `--<name>` flag selects a
//! source; sources come from the YAML file, so they cannot be declared to
//! clap up front and are split out of argv before parsing.

use clap::Parser;
use shopdb_scraper::SourceRegistry;

pub const DEFAULT_MAX_ITEMS: usize = 500;

const BUILTIN_FLAGS: &[&str] = shopdb_core::RESERVED_SOURCE_NAMES;

#[derive(Debug, Parser)]
#[command(name = "shopdb-cli")]
#[command(about = "Scrape configured storefronts and upsert normalized products")]
#[command(
    after_help = "Select sources with --<source-name> flags, e.g. `shopdb-cli --kotn --pact`. \
                  Names come from the sources file; with no source flag the default source runs."
)]
pub struct Cli {
    /// Run every registered source
    #[arg(long)]
    pub all: bool,

    /// Maximum items scraped per source
    #[arg(long, default_value_t = DEFAULT_MAX_ITEMS)]
    pub max: usize,

    /// Scrape and report without writing to the database
    #[arg(long)]
    pub dry_run: bool,
}

/// Parsed built-in flags plus the raw `--<name>` source requests.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    pub requested: Vec<String>,
}

impl Invocation {
    /// Splits `argv` and parses the built-in part.
    ///
    /// # Errors
    ///
    /// Returns the clap error for malformed built-in flags (and for
    /// `--help`/`--version`, which clap reports as errors to print).
    pub fn parse_from<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let (builtin, requested) = split_source_flags(argv.into_iter().map(Into::into));
        let cli = Cli::try_parse_from(builtin)?;
        Ok(Self { cli, requested })
    }

    /// Source names to run, in order.
    ///
    /// `--all` expands to every registered source. Otherwise requested names
    /// are kept in first-seen order; unknown ones are logged and ignored.
    /// When nothing usable was requested the registry's default source runs.
    #[must_use]
    pub fn resolve_sources(&self, registry: &SourceRegistry) -> Vec<String> {
        if self.cli.all {
            return registry.names().into_iter().map(str::to_owned).collect();
        }

        let mut selected: Vec<String> = Vec::new();
        for name in &self.requested {
            if !registry.contains(name) {
                tracing::warn!(flag = %format!("--{name}"), "unknown source flag; ignoring");
                continue;
            }
            if !selected.contains(name) {
                selected.push(name.clone());
            }
        }

        if selected.is_empty() {
            if let Some(default) = registry.default_source() {
                selected.push(default.to_owned());
            }
        }
        selected
    }
}

/// Separates `--<name>` source flags from everything clap should see.
///
/// The program name and any non-flag arguments (such as the value in
/// `--max 50`) stay with the built-ins.
fn split_source_flags(argv: impl Iterator<Item = String>) -> (Vec<String>, Vec<String>) {
    let mut builtin = Vec::new();
    let mut requested = Vec::new();

    for (index, arg) in argv.enumerate() {
        let source = arg
            .strip_prefix("--")
            .filter(|_| index > 0)
            .map(|rest| rest.split('=').next().unwrap_or(rest))
            .filter(|name| !name.is_empty() && !BUILTIN_FLAGS.contains(name))
            .map(str::to_owned);
        match source {
            Some(name) => requested.push(name),
            None => builtin.push(arg),
        }
    }

    (builtin, requested)
}

//! End-of-run report printed to stdout.

use std::fmt;

use shopdb_scraper::RunOutcome;

use crate::import::ImportSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub source: String,
    pub products: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: Vec<SourceLine>,
    pub unique_products: usize,
    /// `None` for a dry run.
    pub import: Option<ImportSummary>,
    pub not_started: Vec<String>,
}

impl RunSummary {
    #[must_use]
    pub fn new(
        outcome: &RunOutcome,
        unique_products: usize,
        import: Option<ImportSummary>,
    ) -> Self {
        Self {
            sources: outcome
                .per_source
                .iter()
                .map(|r| SourceLine {
                    source: r.source.clone(),
                    products: r.product_count(),
                    errors: r.errors.len(),
                })
                .collect(),
            unique_products,
            import,
            not_started: outcome.not_started.clone(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scrape summary")?;
        if self.sources.is_empty() {
            writeln!(f, "  (no sources ran)")?;
        }
        for line in &self.sources {
            write!(f, "  {}: {} products", line.source, line.products)?;
            if line.errors > 0 {
                write!(f, " ({} errors)", line.errors)?;
            }
            writeln!(f)?;
        }
        if !self.not_started.is_empty() {
            writeln!(f, "  not started (cancelled): {}", self.not_started.join(", "))?;
        }
        writeln!(f, "unique products: {}", self.unique_products)?;

        match &self.import {
            Some(import) => {
                write!(
                    f,
                    "import: {} inserted, {} updated, {} errors",
                    import.inserted, import.updated, import.errors
                )?;
                if import.skipped > 0 {
                    write!(f, ", {} skipped (cancelled)", import.skipped)?;
                }
                Ok(())
            }
            None => write!(f, "import: skipped (dry run)"),
        }
    }
}

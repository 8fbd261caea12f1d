//! Contract between the ingestion pipeline and the persistent product store.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::products::NormalizedProduct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub id: i64,
    pub action: UpsertAction,
}

/// Insert-or-update keyed by [`NormalizedProduct::source_url`].
///
/// Implementations must be idempotent: re-submitting an unchanged product
/// reports [`UpsertAction::Updated`] and changes nothing observable. They must
/// also be safe to call concurrently for distinct keys.
pub trait ProductStore: Sync {
    type Error: std::fmt::Display + Send;

    fn upsert(
        &self,
        product: &NormalizedProduct,
    ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send;

    /// Whether a failed upsert is worth retrying. Defaults to never.
    fn is_transient(_error: &Self::Error) -> bool {
        false
    }
}

pub mod adapter;
pub mod discovery;
pub mod error;
pub mod fetcher;
pub mod html;
pub mod normalize;
pub mod orchestrator;
pub mod origin;
pub mod rate_limit;
pub mod registry;
pub mod types;

pub use adapter::{Adapter, JsonLdAdapter, RawPayload, ShopifyAdapter};
pub use discovery::ItemHandle;
pub use error::ScraperError;
pub use fetcher::{BatchReport, FetchPolicy, HttpFetcher, RateLimitState, RateLimitedFetcher};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use rate_limit::{fetch_backoff, with_retry};
pub use registry::SourceRegistry;
pub use types::{ShopifyProduct, ShopifyProductResponse, ShopifyVariant};

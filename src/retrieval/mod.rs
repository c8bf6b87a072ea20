//! Retrieval engine: channel metadata, paginated history, author enrichment

mod enrich;
mod facade;
mod paginate;

pub use enrich::{EnrichmentReport, Enricher};
pub use facade::{DEFAULT_CONCURRENT_REQUESTS, Retrieval, RetrievalOptions, Retriever};
pub use paginate::{Harvest, Paginator, StopReason};

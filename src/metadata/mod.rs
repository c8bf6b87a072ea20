//! Metadata caching for author enrichment
//!
//! Key features:
//! - Run-scoped: created when a retrieval starts, dropped when it ends
//! - No eviction or expiry: bounded by the servers and authors a run touches
//! - Shared across concurrent enrichment tasks through `DashMap`

mod cache;

pub use cache::{CacheKey, CacheStats, CacheValue, MetadataCache};

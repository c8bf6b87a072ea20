pub mod config;
pub mod discord;
pub mod error;
pub mod export;
pub mod logging;
pub mod metadata;
pub mod retrieval;

pub use error::{Result, ScraperError};

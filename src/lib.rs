pub mod adapters;
pub mod alerts;
pub mod fetcher;
pub mod ingester;
pub mod orchestrator;
pub mod scoring;
pub mod seed;
pub mod store;
pub mod types;

pub use adapters::{AdapterSet, FetchArticles};
pub use alerts::AlertMatcher;
pub use fetcher::Fetcher;
pub use ingester::ArticleIngester;
pub use orchestrator::FetchOrchestrator;
pub use store::{MemoryStore, PgStore};
pub use types::*;

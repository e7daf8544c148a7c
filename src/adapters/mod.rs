pub mod api;
pub mod rss;
pub mod scrape;

pub use api::ApiAdapter;
pub use rss::RssAdapter;
pub use scrape::ScrapeAdapter;

use crate::types::{FetchConfig, RawArticle, Result, Source, SourceType};
use async_trait::async_trait;

/// Capability contract for pulling raw articles from one source protocol.
///
/// Adapters convert whatever the upstream returns into [`RawArticle`]s and
/// surface failures as [`crate::types::IngestError`]; they never touch
/// storage.
#[async_trait]
pub trait FetchArticles: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawArticle>>;
}

/// One adapter instance per source type, selected by a tagged lookup.
pub struct AdapterSet {
    rss: Box<dyn FetchArticles>,
    api: Box<dyn FetchArticles>,
    scrape: Box<dyn FetchArticles>,
}

impl AdapterSet {
    pub fn new(config: FetchConfig) -> Result<Self> {
        Ok(Self {
            rss: Box::new(RssAdapter::new(config)?),
            api: Box::new(ApiAdapter),
            scrape: Box::new(ScrapeAdapter),
        })
    }

    /// Assemble a set from arbitrary adapters. Integration tests use this to
    /// substitute scripted adapters for the network-backed ones.
    pub fn from_parts(
        rss: Box<dyn FetchArticles>,
        api: Box<dyn FetchArticles>,
        scrape: Box<dyn FetchArticles>,
    ) -> Self {
        Self { rss, api, scrape }
    }

    pub fn for_type(&self, kind: SourceType) -> &dyn FetchArticles {
        match kind {
            SourceType::Rss => self.rss.as_ref(),
            SourceType::Api => self.api.as_ref(),
            SourceType::Scrape => self.scrape.as_ref(),
        }
    }
}

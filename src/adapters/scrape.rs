use super::FetchArticles;
use crate::types::{IngestError, RawArticle, Result, Source};
use async_trait::async_trait;

/// Placeholder adapter for sources that require web scraping.
///
/// Scraping needs per-source selectors, pagination rules, and rate limits,
/// so this variant always fails with a configuration error naming the
/// source rather than pretending the fetch succeeded.
pub struct ScrapeAdapter;

#[async_trait]
impl FetchArticles for ScrapeAdapter {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawArticle>> {
        Err(IngestError::AdapterNotConfigured {
            kind: "Scrape",
            name: source.name.clone(),
            slug: source.slug.clone(),
        })
    }
}

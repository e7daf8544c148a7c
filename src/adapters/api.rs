use super::FetchArticles;
use crate::types::{IngestError, RawArticle, Result, Source};
use async_trait::async_trait;

/// Placeholder adapter for sources that require direct API integration.
///
/// Every API source needs its own credentials, endpoint, and response
/// mapping before it can be fetched, so this variant always fails with a
/// configuration error naming the source. It must not be "fixed" into
/// returning an empty list: an empty list would record a successful fetch
/// for a source that was never actually fetched.
pub struct ApiAdapter;

#[async_trait]
impl FetchArticles for ApiAdapter {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawArticle>> {
        Err(IngestError::AdapterNotConfigured {
            kind: "API",
            name: source.name.clone(),
            slug: source.slug.clone(),
        })
    }
}

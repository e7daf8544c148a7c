use crate::adapters::AdapterSet;
use crate::alerts::AlertMatcher;
use crate::ingester::ArticleIngester;
use crate::store::{FetchLogStore, SourceStore};
use crate::types::{
    FetchLogCompletion, FetchResult, FetchStatus, IngestError, Result, Source,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Upper bound on adapter calls in flight at once.
const CONCURRENCY_LIMIT: usize = 5;

/// Drives the fetch cycle: every enabled source in bounded-parallel batches,
/// then one alert-evaluation pass for the whole cycle.
pub struct FetchOrchestrator {
    sources: Arc<dyn SourceStore>,
    fetch_logs: Arc<dyn FetchLogStore>,
    adapters: Arc<AdapterSet>,
    ingester: Arc<ArticleIngester>,
    matcher: Arc<AlertMatcher>,
}

impl FetchOrchestrator {
    pub fn new(
        sources: Arc<dyn SourceStore>,
        fetch_logs: Arc<dyn FetchLogStore>,
        adapters: Arc<AdapterSet>,
        ingester: Arc<ArticleIngester>,
        matcher: Arc<AlertMatcher>,
    ) -> Self {
        Self {
            sources,
            fetch_logs,
            adapters,
            ingester,
            matcher,
        }
    }

    /// Fetch every enabled source. Sources run in sequential batches of
    /// [`CONCURRENCY_LIMIT`] concurrent tasks; outcomes within a batch may
    /// complete in any order. Never fails: per-source trouble lands in the
    /// returned results and fetch logs, and storage trouble is logged.
    pub async fn fetch_all(self: &Arc<Self>) -> Vec<FetchResult> {
        let sources = match self.sources.list_enabled().await {
            Ok(sources) => sources,
            Err(e) => {
                error!("Failed to load enabled sources: {}", e);
                return Vec::new();
            }
        };

        info!("Starting fetch cycle for {} sources", sources.len());
        let mut results = Vec::with_capacity(sources.len());

        for batch in sources.chunks(CONCURRENCY_LIMIT) {
            let mut tasks = JoinSet::new();

            for source in batch {
                let orchestrator = Arc::clone(self);
                let source_id = source.id;
                tasks.spawn(async move { orchestrator.fetch_source(source_id).await });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(result)) => results.push(result),
                    // fetch_source absorbs adapter and article errors; an
                    // Err here means storage itself failed for that source.
                    Ok(Err(e)) => error!("Source fetch aborted: {}", e),
                    Err(e) => error!("Fetch task panicked: {}", e),
                }
            }
        }

        // One evaluation pass per cycle, strictly after every source has
        // resolved. A failure here must not fail the cycle.
        match self.matcher.evaluate_new_articles().await {
            Ok(count) => info!("Created {} notifications", count),
            Err(e) => error!("Failed to evaluate notifications: {}", e),
        }

        results
    }

    /// Fetch one source end to end: open a fetch log, run the adapter,
    /// ingest each item with per-item error capture, then finalize the log
    /// and the source status.
    ///
    /// An unknown id fails loudly; batch flow only passes ids drawn from the
    /// enabled-sources query, so this is reachable via manual invocation
    /// only.
    pub async fn fetch_source(&self, source_id: Uuid) -> Result<FetchResult> {
        let start = Instant::now();

        let source = self
            .sources
            .find_by_id(source_id)
            .await?
            .ok_or(IngestError::SourceNotFound { id: source_id })?;

        let log = self.fetch_logs.create(source.id, Utc::now()).await?;

        let mut errors: Vec<String> = Vec::new();
        let mut articles_found = 0usize;
        let mut articles_new = 0usize;

        match self.adapters.for_type(source.kind).fetch(&source).await {
            Ok(raw_articles) => {
                articles_found = raw_articles.len();

                for raw in &raw_articles {
                    match self.ingester.process(raw, &source).await {
                        Ok(true) => articles_new += 1,
                        Ok(false) => {}
                        // One bad article must not void the whole fetch.
                        Err(e) => errors.push(format!("Article \"{}\": {}", raw.title, e)),
                    }
                }
            }
            Err(e) => {
                warn!("Adapter failed for source {}: {}", source.slug, e);
                errors.push(e.to_string());
            }
        }

        let status = if errors.is_empty() {
            FetchStatus::Success
        } else if errors.len() < articles_found {
            FetchStatus::Partial
        } else {
            FetchStatus::Failed
        };

        self.finalize(&source, log.id, status, articles_found, articles_new, &errors)
            .await?;

        info!(
            "Fetched source {}: {:?}, {} found, {} new, {} errors",
            source.slug,
            status,
            articles_found,
            articles_new,
            errors.len()
        );

        Ok(FetchResult {
            source_id: source.id,
            source_name: source.name,
            status,
            articles_found,
            articles_new,
            errors,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn finalize(
        &self,
        source: &Source,
        log_id: Uuid,
        status: FetchStatus,
        articles_found: usize,
        articles_new: usize,
        errors: &[String],
    ) -> Result<()> {
        let now = Utc::now();

        self.fetch_logs
            .complete(
                log_id,
                FetchLogCompletion {
                    completed_at: now,
                    status,
                    articles_found: articles_found as i32,
                    articles_new: articles_new as i32,
                    errors: errors.to_vec(),
                },
            )
            .await?;

        if status == FetchStatus::Failed {
            self.sources.mark_error(source.id).await?;
        } else {
            self.sources.mark_fetched(source.id, now).await?;
        }

        Ok(())
    }
}

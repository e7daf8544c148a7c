use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use worldpress_ingest::adapters::{AdapterSet, ApiAdapter, FetchArticles, ScrapeAdapter};
use worldpress_ingest::alerts::AlertMatcher;
use worldpress_ingest::ingester::ArticleIngester;
use worldpress_ingest::orchestrator::FetchOrchestrator;
use worldpress_ingest::store::{ArticleStore, MemoryStore};
use worldpress_ingest::types::{
    AlertRule, Article, Category, FetchStatus, IngestError, NewArticle, RawArticle, Result,
    Source, SourceConfig, SourceStatus, SourceType,
};

fn source(name: &str) -> Source {
    let slug = name.to_lowercase().replace(' ', "-");
    Source {
        id: Uuid::new_v4(),
        name: name.to_string(),
        url: format!("https://{}.example.com", slug),
        feed_url: Some(format!("https://{}.example.com/rss.xml", slug)),
        slug,
        kind: SourceType::Rss,
        region: Some("global".to_string()),
        language: "en".to_string(),
        category_hint: None,
        config: SourceConfig::default(),
        enabled: true,
        status: SourceStatus::Active,
        last_fetched_at: None,
    }
}

fn raw(title: &str, url: &str) -> RawArticle {
    RawArticle {
        title: title.to_string(),
        source_url: url.to_string(),
        ..RawArticle::default()
    }
}

/// Returns a fixed list of articles on every fetch.
struct ScriptedAdapter {
    articles: Vec<RawArticle>,
}

#[async_trait]
impl FetchArticles for ScriptedAdapter {
    async fn fetch(&self, _source: &Source) -> Result<Vec<RawArticle>> {
        Ok(self.articles.clone())
    }
}

/// Fails every fetch outright, like an unreachable or malformed feed.
struct FailingAdapter;

#[async_trait]
impl FetchArticles for FailingAdapter {
    async fn fetch(&self, _source: &Source) -> Result<Vec<RawArticle>> {
        Err(IngestError::Parse("feed body is not XML".to_string()))
    }
}

/// Records the peak number of fetches in flight at once.
struct TrackingAdapter {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl FetchArticles for TrackingAdapter {
    async fn fetch(&self, _source: &Source) -> Result<Vec<RawArticle>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Delegates to a real store but fails `create` for the listed titles.
struct FlakyArticleStore {
    inner: Arc<MemoryStore>,
    fail_titles: Vec<String>,
}

#[async_trait]
impl ArticleStore for FlakyArticleStore {
    async fn find_by_dedup_hash(&self, hash: &str) -> Result<Option<Article>> {
        self.inner.find_by_dedup_hash(hash).await
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        if self.fail_titles.contains(&article.title) {
            return Err(IngestError::General("simulated storage outage".to_string()));
        }
        self.inner.create(article).await
    }

    async fn created_since(&self, since: chrono::DateTime<chrono::Utc>) -> Result<Vec<Article>> {
        self.inner.created_since(since).await
    }
}

fn build(store: &Arc<MemoryStore>, rss: Box<dyn FetchArticles>) -> Arc<FetchOrchestrator> {
    build_with_articles(store, store.clone(), rss)
}

fn build_with_articles(
    store: &Arc<MemoryStore>,
    articles: Arc<dyn ArticleStore>,
    rss: Box<dyn FetchArticles>,
) -> Arc<FetchOrchestrator> {
    let adapters = Arc::new(AdapterSet::from_parts(
        rss,
        Box::new(ApiAdapter),
        Box::new(ScrapeAdapter),
    ));
    let ingester = Arc::new(ArticleIngester::new(articles.clone(), store.clone()));
    let matcher = Arc::new(AlertMatcher::new(articles, store.clone(), store.clone()));
    Arc::new(FetchOrchestrator::new(
        store.clone(),
        store.clone(),
        adapters,
        ingester,
        matcher,
    ))
}

#[tokio::test]
async fn successful_fetch_stores_all_articles() {
    let store = Arc::new(MemoryStore::new());
    let src = source("Example Wire");
    store.add_source(src.clone()).await;

    let adapter = ScriptedAdapter {
        articles: vec![
            raw("First story", "https://example.com/1"),
            raw("Second story", "https://example.com/2"),
            raw("Third story", "https://example.com/3"),
        ],
    };
    let orchestrator = build(&store, Box::new(adapter));

    let result = orchestrator.fetch_source(src.id).await.unwrap();

    assert_eq!(result.status, FetchStatus::Success);
    assert_eq!(result.articles_found, 3);
    assert_eq!(result.articles_new, 3);
    assert!(result.errors.is_empty());
    assert_eq!(store.article_count().await, 3);

    let updated = store.get_source(src.id).await.unwrap();
    assert_eq!(updated.status, SourceStatus::Active);
    assert!(updated.last_fetched_at.is_some());

    let logs = store.logs_for(src.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, FetchStatus::Success);
    assert_eq!(logs[0].articles_found, 3);
    assert_eq!(logs[0].articles_new, 3);
    assert!(logs[0].completed_at.is_some());
}

#[tokio::test]
async fn refetching_the_same_feed_creates_nothing_new() {
    let store = Arc::new(MemoryStore::new());
    let src = source("Example Wire");
    store.add_source(src.clone()).await;

    let articles = vec![
        raw("First story", "https://example.com/1"),
        raw("Second story", "https://example.com/2"),
    ];
    let orchestrator = build(
        &store,
        Box::new(ScriptedAdapter {
            articles: articles.clone(),
        }),
    );

    let first = orchestrator.fetch_source(src.id).await.unwrap();
    assert_eq!(first.articles_new, 2);

    let second = orchestrator.fetch_source(src.id).await.unwrap();
    assert_eq!(second.status, FetchStatus::Success);
    assert_eq!(second.articles_found, 2);
    assert_eq!(second.articles_new, 0);
    assert_eq!(store.article_count().await, 2);
}

#[tokio::test]
async fn url_variants_deduplicate_within_one_fetch() {
    let store = Arc::new(MemoryStore::new());
    let src = source("Example Wire");
    store.add_source(src.clone()).await;

    // Same article behind tracking parameters and case noise.
    let orchestrator = build(
        &store,
        Box::new(ScriptedAdapter {
            articles: vec![
                raw("Story", "https://example.com/story"),
                raw("Story", "https://EXAMPLE.com/story/?utm_source=rss"),
            ],
        }),
    );

    let result = orchestrator.fetch_source(src.id).await.unwrap();

    assert_eq!(result.status, FetchStatus::Success);
    assert_eq!(result.articles_found, 2);
    assert_eq!(result.articles_new, 1);
    assert_eq!(store.article_count().await, 1);
}

/// Simulates losing a check-then-insert race: the hash lookup sees nothing,
/// but the insert hits the uniqueness backstop.
struct BlindArticleStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl ArticleStore for BlindArticleStore {
    async fn find_by_dedup_hash(&self, _hash: &str) -> Result<Option<Article>> {
        Ok(None)
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        self.inner.create(article).await
    }

    async fn created_since(&self, since: chrono::DateTime<chrono::Utc>) -> Result<Vec<Article>> {
        self.inner.created_since(since).await
    }
}

#[tokio::test]
async fn uniqueness_backstop_absorbs_a_lost_insert_race() {
    let store = Arc::new(MemoryStore::new());
    let src = source("Example Wire");
    store.add_source(src.clone()).await;

    let blind = Arc::new(BlindArticleStore {
        inner: store.clone(),
    });
    let orchestrator = build_with_articles(
        &store,
        blind,
        Box::new(ScriptedAdapter {
            articles: vec![
                raw("Story", "https://example.com/story"),
                raw("Story", "https://example.com/story"),
            ],
        }),
    );

    let result = orchestrator.fetch_source(src.id).await.unwrap();

    // The duplicate is "not new", never an item error.
    assert_eq!(result.status, FetchStatus::Success);
    assert_eq!(result.articles_found, 2);
    assert_eq!(result.articles_new, 1);
    assert!(result.errors.is_empty());
    assert_eq!(store.article_count().await, 1);
}

#[tokio::test]
async fn persistence_failures_yield_a_partial_fetch() {
    let store = Arc::new(MemoryStore::new());
    let src = source("Example Wire");
    store.add_source(src.clone()).await;

    let flaky = Arc::new(FlakyArticleStore {
        inner: store.clone(),
        fail_titles: vec!["Second story".to_string(), "Fourth story".to_string()],
    });
    let orchestrator = build_with_articles(
        &store,
        flaky,
        Box::new(ScriptedAdapter {
            articles: vec![
                raw("First story", "https://example.com/1"),
                raw("Second story", "https://example.com/2"),
                raw("Third story", "https://example.com/3"),
                raw("Fourth story", "https://example.com/4"),
                raw("Fifth story", "https://example.com/5"),
            ],
        }),
    );

    let result = orchestrator.fetch_source(src.id).await.unwrap();

    assert_eq!(result.status, FetchStatus::Partial);
    assert_eq!(result.articles_found, 5);
    assert_eq!(result.articles_new, 3);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].contains("Second story"));
    assert_eq!(store.article_count().await, 3);

    // Partial still counts as a completed fetch for the source.
    let updated = store.get_source(src.id).await.unwrap();
    assert_eq!(updated.status, SourceStatus::Active);
    assert_eq!(store.logs_for(src.id).await[0].status, FetchStatus::Partial);
}

#[tokio::test]
async fn adapter_failure_marks_source_and_log_failed() {
    let store = Arc::new(MemoryStore::new());
    let src = source("Example Wire");
    store.add_source(src.clone()).await;

    let orchestrator = build(&store, Box::new(FailingAdapter));

    let result = orchestrator.fetch_source(src.id).await.unwrap();

    assert_eq!(result.status, FetchStatus::Failed);
    assert_eq!(result.articles_found, 0);
    assert_eq!(result.articles_new, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("not XML"));

    let updated = store.get_source(src.id).await.unwrap();
    assert_eq!(updated.status, SourceStatus::Error);

    let logs = store.logs_for(src.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, FetchStatus::Failed);
    assert!(logs[0].completed_at.is_some());
}

#[tokio::test]
async fn unconfigured_adapter_fails_rather_than_reporting_empty_success() {
    let store = Arc::new(MemoryStore::new());
    let mut src = source("Partner API");
    src.kind = SourceType::Api;
    store.add_source(src.clone()).await;

    let orchestrator = build(
        &store,
        Box::new(ScriptedAdapter {
            articles: Vec::new(),
        }),
    );

    let result = orchestrator.fetch_source(src.id).await.unwrap();

    assert_eq!(result.status, FetchStatus::Failed);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("not configured"));
}

#[tokio::test]
async fn unknown_source_id_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = build(
        &store,
        Box::new(ScriptedAdapter {
            articles: Vec::new(),
        }),
    );

    let err = orchestrator.fetch_source(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, IngestError::SourceNotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fetch_all_bounds_concurrent_fetches() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..12 {
        store.add_source(source(&format!("Source {:02}", i))).await;
    }

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let orchestrator = build(
        &store,
        Box::new(TrackingAdapter {
            in_flight: in_flight.clone(),
            peak: peak.clone(),
        }),
    );

    let results = orchestrator.fetch_all().await;

    assert_eq!(results.len(), 12);
    assert!(peak.load(Ordering::SeqCst) <= 5);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn category_hint_wins_over_keyword_classification() {
    let store = Arc::new(MemoryStore::new());
    let world = Category {
        id: Uuid::new_v4(),
        slug: "world".to_string(),
        name: "World".to_string(),
    };
    store.add_category(world.clone()).await;

    let mut src = source("Example Wire");
    src.category_hint = Some("world".to_string());
    store.add_source(src.clone()).await;

    let orchestrator = build(
        &store,
        Box::new(ScriptedAdapter {
            articles: vec![raw(
                "Software startup ships new app",
                "https://example.com/tech",
            )],
        }),
    );
    orchestrator.fetch_source(src.id).await.unwrap();

    let articles = store.all_articles().await;
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].category_id, Some(world.id));
}

#[tokio::test]
async fn fetch_cycle_creates_notifications_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    let src = source("Example Wire");
    store.add_source(src.clone()).await;

    store
        .add_alert_rule(AlertRule {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "earthquake watch".to_string(),
            keywords: vec!["earthquake".to_string()],
            min_breaking_score: 0,
            channels: vec!["IN_APP".to_string()],
            category_ids: Vec::new(),
            enabled: true,
        })
        .await;

    let orchestrator = build(
        &store,
        Box::new(ScriptedAdapter {
            articles: vec![
                raw("Earthquake strikes coastal region", "https://example.com/quake"),
                raw("Local bake sale raises funds", "https://example.com/bake"),
            ],
        }),
    );

    orchestrator.fetch_all().await;
    assert_eq!(store.notification_count().await, 1);

    // A second cycle finds the same articles already stored and the
    // notification already created.
    orchestrator.fetch_all().await;
    assert_eq!(store.notification_count().await, 1);
}

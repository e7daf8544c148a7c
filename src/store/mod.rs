pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::types::{
    AlertRule, Article, Category, FetchLog, FetchLogCompletion, NewArticle, NewNotification,
    Notification, Result, Source,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source records are administered externally; the pipeline only reads them
/// and flips their fetch status.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<Source>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Source>>;
    /// Status ACTIVE, last_fetched_at = now.
    async fn mark_fetched(&self, id: Uuid, fetched_at: DateTime<Utc>) -> Result<()>;
    /// Status ERROR; last fetch timestamp untouched.
    async fn mark_error(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn find_by_dedup_hash(&self, hash: &str) -> Result<Option<Article>>;
    /// Insert a new article. A storage-level uniqueness violation on
    /// `dedup_hash` surfaces as [`crate::types::IngestError::DuplicateArticle`].
    async fn create(&self, article: NewArticle) -> Result<Article>;
    async fn created_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>>;
}

#[async_trait]
pub trait FetchLogStore: Send + Sync {
    /// Open a RUNNING log row for one fetch attempt.
    async fn create(&self, source_id: Uuid, started_at: DateTime<Utc>) -> Result<FetchLog>;
    /// Write the completion fields exactly once.
    async fn complete(&self, id: Uuid, completion: FetchLogCompletion) -> Result<()>;
}

#[async_trait]
pub trait AlertRuleStore: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<AlertRule>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn find(
        &self,
        article_id: Uuid,
        alert_rule_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>>;
    async fn create(&self, notification: NewNotification) -> Result<Notification>;
}

use super::{
    AlertRuleStore, ArticleStore, CategoryStore, FetchLogStore, NotificationStore, SourceStore,
};
use crate::types::{
    AlertRule, Article, Category, FetchLog, FetchLogCompletion, FetchStatus, IngestError,
    NewArticle, NewNotification, Notification, Result, Source, SourceStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory implementation of every store trait.
///
/// Backs the integration tests and local demos. Mirrors the storage-layer
/// guarantees the Postgres schema provides, in particular the uniqueness of
/// `dedup_hash` and of the notification triple.
#[derive(Default)]
pub struct MemoryStore {
    sources: RwLock<HashMap<Uuid, Source>>,
    articles: RwLock<HashMap<Uuid, Article>>,
    categories: RwLock<HashMap<Uuid, Category>>,
    fetch_logs: RwLock<HashMap<Uuid, FetchLog>>,
    alert_rules: RwLock<HashMap<Uuid, AlertRule>>,
    notifications: RwLock<HashMap<Uuid, Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_source(&self, source: Source) {
        self.sources.write().await.insert(source.id, source);
    }

    pub async fn add_category(&self, category: Category) {
        self.categories.write().await.insert(category.id, category);
    }

    pub async fn add_alert_rule(&self, rule: AlertRule) {
        self.alert_rules.write().await.insert(rule.id, rule);
    }

    pub async fn get_source(&self, id: Uuid) -> Option<Source> {
        self.sources.read().await.get(&id).cloned()
    }

    pub async fn logs_for(&self, source_id: Uuid) -> Vec<FetchLog> {
        let mut logs: Vec<FetchLog> = self
            .fetch_logs
            .read()
            .await
            .values()
            .filter(|l| l.source_id == source_id)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.started_at);
        logs
    }

    pub async fn article_count(&self) -> usize {
        self.articles.read().await.len()
    }

    pub async fn notification_count(&self) -> usize {
        self.notifications.read().await.len()
    }

    pub async fn all_articles(&self) -> Vec<Article> {
        self.articles.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SourceStore for MemoryStore {
    async fn list_enabled(&self) -> Result<Vec<Source>> {
        let mut sources: Vec<Source> = self
            .sources
            .read()
            .await
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Source>> {
        Ok(self.sources.read().await.get(&id).cloned())
    }

    async fn mark_fetched(&self, id: Uuid, fetched_at: DateTime<Utc>) -> Result<()> {
        if let Some(source) = self.sources.write().await.get_mut(&id) {
            source.status = SourceStatus::Active;
            source.last_fetched_at = Some(fetched_at);
        }
        Ok(())
    }

    async fn mark_error(&self, id: Uuid) -> Result<()> {
        if let Some(source) = self.sources.write().await.get_mut(&id) {
            source.status = SourceStatus::Error;
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn find_by_dedup_hash(&self, hash: &str) -> Result<Option<Article>> {
        Ok(self
            .articles
            .read()
            .await
            .values()
            .find(|a| a.dedup_hash == hash)
            .cloned())
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        let mut articles = self.articles.write().await;

        // Uniqueness backstop, same as the UNIQUE index in Postgres.
        if articles.values().any(|a| a.dedup_hash == article.dedup_hash) {
            return Err(IngestError::DuplicateArticle);
        }

        let stored = Article {
            id: Uuid::new_v4(),
            title: article.title,
            summary: article.summary,
            content: article.content,
            author: article.author,
            published_at: article.published_at,
            source_url: article.source_url,
            image_url: article.image_url,
            language: article.language,
            country: article.country,
            tags: article.tags,
            breaking_score: article.breaking_score,
            dedup_hash: article.dedup_hash,
            source_id: article.source_id,
            category_id: article.category_id,
            created_at: Utc::now(),
        };
        articles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn created_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>> {
        Ok(self
            .articles
            .read()
            .await
            .values()
            .filter(|a| a.created_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self
            .categories
            .read()
            .await
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl FetchLogStore for MemoryStore {
    async fn create(&self, source_id: Uuid, started_at: DateTime<Utc>) -> Result<FetchLog> {
        let log = FetchLog {
            id: Uuid::new_v4(),
            source_id,
            started_at,
            completed_at: None,
            status: FetchStatus::Running,
            articles_found: 0,
            articles_new: 0,
            errors: Vec::new(),
        };
        self.fetch_logs.write().await.insert(log.id, log.clone());
        Ok(log)
    }

    async fn complete(&self, id: Uuid, completion: FetchLogCompletion) -> Result<()> {
        let mut logs = self.fetch_logs.write().await;
        let log = logs
            .get_mut(&id)
            .ok_or_else(|| IngestError::General(format!("Fetch log not found: {}", id)))?;
        log.completed_at = Some(completion.completed_at);
        log.status = completion.status;
        log.articles_found = completion.articles_found;
        log.articles_new = completion.articles_new;
        log.errors = completion.errors;
        Ok(())
    }
}

#[async_trait]
impl AlertRuleStore for MemoryStore {
    async fn list_enabled(&self) -> Result<Vec<AlertRule>> {
        Ok(self
            .alert_rules
            .read()
            .await
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn find(
        &self,
        article_id: Uuid,
        alert_rule_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>> {
        Ok(self
            .notifications
            .read()
            .await
            .values()
            .find(|n| {
                n.article_id == article_id
                    && n.alert_rule_id == alert_rule_id
                    && n.user_id == user_id
            })
            .cloned())
    }

    async fn create(&self, notification: NewNotification) -> Result<Notification> {
        let mut notifications = self.notifications.write().await;

        if notifications.values().any(|n| {
            n.article_id == notification.article_id
                && n.alert_rule_id == notification.alert_rule_id
                && n.user_id == notification.user_id
        }) {
            return Err(IngestError::General(
                "Notification already exists for this article/rule/user".to_string(),
            ));
        }

        let stored = Notification {
            id: Uuid::new_v4(),
            channel: notification.channel,
            status: notification.status,
            user_id: notification.user_id,
            article_id: notification.article_id,
            alert_rule_id: notification.alert_rule_id,
            created_at: Utc::now(),
        };
        notifications.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

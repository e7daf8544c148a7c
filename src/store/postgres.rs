use super::{
    AlertRuleStore, ArticleStore, CategoryStore, FetchLogStore, NotificationStore, SourceStore,
};
use crate::types::{
    AlertRule, Article, Category, FetchLog, FetchLogCompletion, FetchStatus, IngestError,
    NewArticle, NewNotification, Notification, NotificationChannel, NotificationStatus, Result,
    Source, SourceConfig, SourceStatus, SourceType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

/// Postgres implementation of every store trait, one pool for all of them.
///
/// Queries are runtime-checked (`sqlx::query` + `try_get`) so the crate
/// builds without a live database.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| IngestError::General(format!("Migration failed: {}", e)))?;

        info!("Connected to Postgres and applied migrations");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn string_list(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

fn uuid_list(value: serde_json::Value) -> Vec<Uuid> {
    serde_json::from_value(value).unwrap_or_default()
}

fn source_from_row(row: &PgRow) -> Result<Source> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let config: Option<serde_json::Value> = row.try_get("config")?;

    Ok(Source {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        url: row.try_get("url")?,
        feed_url: row.try_get("feed_url")?,
        kind: SourceType::parse(&kind)
            .ok_or_else(|| IngestError::General(format!("Unknown source type: {}", kind)))?,
        region: row.try_get("region")?,
        language: row.try_get("language")?,
        category_hint: row.try_get("category_hint")?,
        config: SourceConfig::from_value(config),
        enabled: row.try_get("enabled")?,
        status: SourceStatus::parse(&status)
            .ok_or_else(|| IngestError::General(format!("Unknown source status: {}", status)))?,
        last_fetched_at: row.try_get("last_fetched_at")?,
    })
}

fn article_from_row(row: &PgRow) -> Result<Article> {
    let tags: serde_json::Value = row.try_get("tags")?;

    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        content: row.try_get("content")?,
        author: row.try_get("author")?,
        published_at: row.try_get("published_at")?,
        source_url: row.try_get("source_url")?,
        image_url: row.try_get("image_url")?,
        language: row.try_get("language")?,
        country: row.try_get("country")?,
        tags: string_list(tags),
        breaking_score: row.try_get("breaking_score")?,
        dedup_hash: row.try_get("dedup_hash")?,
        source_id: row.try_get("source_id")?,
        category_id: row.try_get("category_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[async_trait]
impl SourceStore for PgStore {
    async fn list_enabled(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query("SELECT * FROM sources WHERE enabled = true ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(source_from_row).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Source>> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(source_from_row).transpose()
    }

    async fn mark_fetched(&self, id: Uuid, fetched_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sources SET status = $1, last_fetched_at = $2 WHERE id = $3")
            .bind(SourceStatus::Active.as_str())
            .bind(fetched_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_error(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE sources SET status = $1 WHERE id = $2")
            .bind(SourceStatus::Error.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn find_by_dedup_hash(&self, hash: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE dedup_hash = $1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO articles (id, title, summary, content, author, published_at, source_url,
                                  image_url, language, country, tags, breaking_score, dedup_hash,
                                  source_id, category_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.author)
        .bind(article.published_at)
        .bind(&article.source_url)
        .bind(&article.image_url)
        .bind(&article.language)
        .bind(&article.country)
        .bind(serde_json::to_value(&article.tags)?)
        .bind(article.breaking_score)
        .bind(&article.dedup_hash)
        .bind(article.source_id)
        .bind(article.category_id)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Article {
                id,
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
                created_at: now,
            }),
            // The unique index on dedup_hash is the enforcing mechanism for
            // deduplication; report a lost race as a duplicate, not a failure.
            Err(e) if is_unique_violation(&e) => Err(IngestError::DuplicateArticle),
            Err(e) => Err(e.into()),
        }
    }

    async fn created_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT * FROM articles WHERE created_at >= $1")
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(article_from_row).collect()
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, slug, name FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(Category {
                id: row.try_get("id")?,
                slug: row.try_get("slug")?,
                name: row.try_get("name")?,
            }),
            None => None,
        })
    }
}

#[async_trait]
impl FetchLogStore for PgStore {
    async fn create(&self, source_id: Uuid, started_at: DateTime<Utc>) -> Result<FetchLog> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO fetch_logs (id, source_id, started_at, status) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(source_id)
        .bind(started_at)
        .bind(FetchStatus::Running.as_str())
        .execute(&self.pool)
        .await?;

        Ok(FetchLog {
            id,
            source_id,
            started_at,
            completed_at: None,
            status: FetchStatus::Running,
            articles_found: 0,
            articles_new: 0,
            errors: Vec::new(),
        })
    }

    async fn complete(&self, id: Uuid, completion: FetchLogCompletion) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE fetch_logs
            SET completed_at = $1, status = $2, articles_found = $3, articles_new = $4, errors = $5
            WHERE id = $6
            "#,
        )
        .bind(completion.completed_at)
        .bind(completion.status.as_str())
        .bind(completion.articles_found)
        .bind(completion.articles_new)
        .bind(serde_json::to_value(&completion.errors)?)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AlertRuleStore for PgStore {
    async fn list_enabled(&self) -> Result<Vec<AlertRule>> {
        let rows = sqlx::query("SELECT * FROM alert_rules WHERE enabled = true")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let keywords: serde_json::Value = row.try_get("keywords")?;
            let channels: serde_json::Value = row.try_get("channels")?;
            let category_ids: serde_json::Value = row.try_get("category_ids")?;

            rules.push(AlertRule {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                name: row.try_get("name")?,
                keywords: string_list(keywords),
                min_breaking_score: row.try_get("min_breaking_score")?,
                channels: string_list(channels),
                category_ids: uuid_list(category_ids),
                enabled: row.try_get("enabled")?,
            });
        }

        Ok(rules)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn find(
        &self,
        article_id: Uuid,
        alert_rule_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>> {
        let row = sqlx::query(
            "SELECT * FROM notifications WHERE article_id = $1 AND alert_rule_id = $2 AND user_id = $3",
        )
        .bind(article_id)
        .bind(alert_rule_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => {
                let channel: String = row.try_get("channel")?;
                let status: String = row.try_get("status")?;
                Some(Notification {
                    id: row.try_get("id")?,
                    channel: NotificationChannel::parse(&channel).ok_or_else(|| {
                        IngestError::General(format!("Unknown channel: {}", channel))
                    })?,
                    status: NotificationStatus::parse(&status).ok_or_else(|| {
                        IngestError::General(format!("Unknown notification status: {}", status))
                    })?,
                    user_id: row.try_get("user_id")?,
                    article_id: row.try_get("article_id")?,
                    alert_rule_id: row.try_get("alert_rule_id")?,
                    created_at: row.try_get("created_at")?,
                })
            }
            None => None,
        })
    }

    async fn create(&self, notification: NewNotification) -> Result<Notification> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notifications (id, channel, status, user_id, article_id, alert_rule_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(notification.channel.as_str())
        .bind(notification.status.as_str())
        .bind(notification.user_id)
        .bind(notification.article_id)
        .bind(notification.alert_rule_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id,
            channel: notification.channel,
            status: notification.status,
            user_id: notification.user_id,
            article_id: notification.article_id,
            alert_rule_id: notification.alert_rule_id,
            created_at: now,
        })
    }
}

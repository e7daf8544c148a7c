use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol a source is fetched over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Rss,
    Api,
    Scrape,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Rss => "RSS",
            SourceType::Api => "API",
            SourceType::Scrape => "SCRAPE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RSS" => Some(SourceType::Rss),
            "API" => Some(SourceType::Api),
            "SCRAPE" => Some(SourceType::Scrape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Active,
    Paused,
    Error,
    Disabled,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Active => "ACTIVE",
            SourceStatus::Paused => "PAUSED",
            SourceStatus::Error => "ERROR",
            SourceStatus::Disabled => "DISABLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(SourceStatus::Active),
            "PAUSED" => Some(SourceStatus::Paused),
            "ERROR" => Some(SourceStatus::Error),
            "DISABLED" => Some(SourceStatus::Disabled),
            _ => None,
        }
    }
}

/// Free-form per-source configuration, validated once when the row is loaded.
///
/// `tier` is the admin-assigned quality rank (1 = highest) consumed by the
/// breaking scorer; `note` is operator-facing and unused by the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub tier: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl SourceConfig {
    /// Deserialize a config blob, degrading to the default on anything
    /// unreadable. A bad blob should not keep the source from fetching.
    pub fn from_value(value: Option<serde_json::Value>) -> Self {
        match value {
            Some(v) => serde_json::from_value(v).unwrap_or_else(|e| {
                tracing::warn!("Unreadable source config, using defaults: {}", e);
                SourceConfig::default()
            }),
            None => SourceConfig::default(),
        }
    }
}

/// A configured external feed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub feed_url: Option<String>,
    pub kind: SourceType,
    pub region: Option<String>,
    pub language: String,
    pub category_hint: Option<String>,
    pub config: SourceConfig,
    pub enabled: bool,
    pub status: SourceStatus,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Transient article shape produced by an adapter, consumed and discarded by
/// the ingester. Never persisted as-is.
#[derive(Debug, Clone, Default)]
pub struct RawArticle {
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

/// A stored article. Created exactly once by the ingester and never updated
/// by this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: String,
    pub image_url: Option<String>,
    pub language: String,
    pub country: Option<String>,
    pub tags: Vec<String>,
    pub breaking_score: i32,
    pub dedup_hash: String,
    pub source_id: Uuid,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Field set for inserting a new article.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: String,
    pub image_url: Option<String>,
    pub language: String,
    pub country: Option<String>,
    pub tags: Vec<String>,
    pub breaking_score: i32,
    pub dedup_hash: String,
    pub source_id: Uuid,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

/// Outcome status of one source fetch. `Running` only ever appears on an
/// open fetch log, never on a completed one or on a `FetchResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Running,
    Success,
    Partial,
    Failed,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Running => "RUNNING",
            FetchStatus::Success => "SUCCESS",
            FetchStatus::Partial => "PARTIAL",
            FetchStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(FetchStatus::Running),
            "SUCCESS" => Some(FetchStatus::Success),
            "PARTIAL" => Some(FetchStatus::Partial),
            "FAILED" => Some(FetchStatus::Failed),
            _ => None,
        }
    }
}

/// Record of one fetch attempt for one source. Completed exactly once and
/// immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLog {
    pub id: Uuid,
    pub source_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: FetchStatus,
    pub articles_found: i32,
    pub articles_new: i32,
    pub errors: Vec<String>,
}

/// Completion fields written back to a fetch log.
#[derive(Debug, Clone)]
pub struct FetchLogCompletion {
    pub completed_at: DateTime<Utc>,
    pub status: FetchStatus,
    pub articles_found: i32,
    pub articles_new: i32,
    pub errors: Vec<String>,
}

/// User-owned alert predicate. Owned and mutated by external CRUD; read-only
/// to this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub keywords: Vec<String>,
    pub min_breaking_score: i32,
    pub channels: Vec<String>,
    pub category_ids: Vec<Uuid>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    InApp,
    Email,
    Push,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::InApp => "IN_APP",
            NotificationChannel::Email => "EMAIL",
            NotificationChannel::Push => "PUSH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_APP" => Some(NotificationChannel::InApp),
            "EMAIL" => Some(NotificationChannel::Email),
            "PUSH" => Some(NotificationChannel::Push),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "PENDING",
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Failed => "FAILED",
            NotificationStatus::Read => "READ",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(NotificationStatus::Pending),
            "SENT" => Some(NotificationStatus::Sent),
            "FAILED" => Some(NotificationStatus::Failed),
            "READ" => Some(NotificationStatus::Read),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub channel: NotificationChannel,
    pub status: NotificationStatus,
    pub user_id: Uuid,
    pub article_id: Uuid,
    pub alert_rule_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Field set for inserting a new notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub channel: NotificationChannel,
    pub status: NotificationStatus,
    pub user_id: Uuid,
    pub article_id: Uuid,
    pub alert_rule_id: Uuid,
}

/// Per-source outcome returned by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub source_id: Uuid,
    pub source_name: String,
    pub status: FetchStatus,
    pub articles_found: usize,
    pub articles_new: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// HTTP fetch behavior shared by all adapters.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "WorldPressDigest/1.0".to_string(),
            timeout_seconds: 15,
            max_retries: 2,
            retry_delay_seconds: 2,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Source not found: {id}")]
    SourceNotFound { id: Uuid },

    #[error("{kind} adapter not configured for source {name} ({slug}); per-source integration work is required")]
    AdapterNotConfigured {
        kind: &'static str,
        name: String,
        slug: String,
    },

    #[error("Article already exists for this dedup hash")]
    DuplicateArticle,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;

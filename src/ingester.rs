use crate::scoring::breaking_score;
use crate::store::{ArticleStore, CategoryStore};
use crate::types::{IngestError, NewArticle, RawArticle, Result, Source};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Category keyword table used when a source carries no usable category
/// hint. Iteration order is fixed; ties resolve to the first category that
/// reaches the maximum hit count.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "technology",
        &[
            "tech", "software", "hardware", "ai", "artificial intelligence", "machine learning",
            "startup", "app", "cyber", "digital", "silicon valley", "programming", "algorithm",
            "cloud computing", "blockchain", "crypto", "robot", "automation", "gadget",
            "smartphone",
        ],
    ),
    (
        "business",
        &[
            "stock", "market", "economy", "gdp", "trade", "investment", "finance", "bank",
            "revenue", "profit", "merger", "acquisition", "ipo", "startup", "entrepreneur",
            "corporation", "inflation", "recession",
        ],
    ),
    (
        "politics",
        &[
            "election", "president", "congress", "senate", "parliament", "democrat", "republican",
            "vote", "legislation", "policy", "governor", "mayor", "diplomat", "sanction",
            "government", "political", "campaign",
        ],
    ),
    (
        "science",
        &[
            "research", "study", "scientist", "nasa", "space", "discovery", "experiment",
            "physics", "biology", "chemistry", "genome", "climate", "fossil", "evolution",
            "quantum", "laboratory",
        ],
    ),
    (
        "sports",
        &[
            "football", "soccer", "basketball", "tennis", "olympics", "championship",
            "tournament", "league", "nba", "nfl", "fifa", "goal", "match", "coach", "athlete",
            "medal", "cricket", "rugby",
        ],
    ),
    (
        "health",
        &[
            "health", "medical", "hospital", "vaccine", "disease", "pandemic", "doctor",
            "treatment", "surgery", "mental health", "cancer", "drug", "pharmaceutical",
            "clinical trial", "who", "cdc",
        ],
    ),
    (
        "culture",
        &[
            "movie", "film", "music", "art", "book", "museum", "festival", "theater",
            "celebrity", "fashion", "entertainment", "oscar", "grammy", "exhibition", "concert",
            "streaming",
        ],
    ),
];

/// Minimum keyword hits before a classification is accepted.
const CLASSIFY_THRESHOLD: usize = 2;

/// Turns one raw article into a durable record: dedup, classify, score,
/// persist.
pub struct ArticleIngester {
    articles: Arc<dyn ArticleStore>,
    categories: Arc<dyn CategoryStore>,
}

impl ArticleIngester {
    pub fn new(articles: Arc<dyn ArticleStore>, categories: Arc<dyn CategoryStore>) -> Self {
        Self {
            articles,
            categories,
        }
    }

    /// Process a single raw article. Returns true when a new article was
    /// stored, false when it deduplicated against an existing one.
    pub async fn process(&self, raw: &RawArticle, source: &Source) -> Result<bool> {
        let normalized = normalize_url(&raw.source_url);
        let hash = dedup_hash(&normalized);

        // Advisory check; the storage-level unique constraint is the
        // authority under concurrent ingestion.
        if self.articles.find_by_dedup_hash(&hash).await?.is_some() {
            debug!("Skipping duplicate article: {}", raw.source_url);
            return Ok(false);
        }

        let category_id = self.classify(raw, source).await?;
        let score = breaking_score(raw, &source.config, Utc::now());

        let article = NewArticle {
            title: raw.title.clone(),
            summary: raw.summary.clone(),
            content: raw.content.clone(),
            author: raw.author.clone(),
            published_at: raw.published_at,
            source_url: raw.source_url.clone(),
            image_url: raw.image_url.clone(),
            language: source.language.clone(),
            country: source.region.clone(),
            tags: raw.tags.clone(),
            breaking_score: score,
            dedup_hash: hash,
            source_id: source.id,
            category_id,
        };

        match self.articles.create(article).await {
            Ok(_) => Ok(true),
            // Lost a race against a concurrent insert of the same URL.
            Err(IngestError::DuplicateArticle) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Category priority: the source's hint when it names a real category,
    /// else keyword classification over title + summary.
    async fn classify(&self, raw: &RawArticle, source: &Source) -> Result<Option<Uuid>> {
        if let Some(hint) = &source.category_hint {
            if let Some(category) = self.categories.find_by_slug(hint).await? {
                return Ok(Some(category.id));
            }
        }

        let text = format!(
            "{} {}",
            raw.title,
            raw.summary.as_deref().unwrap_or_default()
        )
        .to_lowercase();

        if let Some(slug) = keyword_classify(&text) {
            if let Some(category) = self.categories.find_by_slug(slug).await? {
                return Ok(Some(category.id));
            }
        }

        Ok(None)
    }
}

/// Pick the category with the most keyword hits in the given lowercased
/// text, requiring at least [`CLASSIFY_THRESHOLD`] hits.
pub(crate) fn keyword_classify(text: &str) -> Option<&'static str> {
    let mut best_slug = None;
    let mut best_count = 0;

    for (slug, keywords) in CATEGORY_KEYWORDS {
        let count = keywords.iter().filter(|k| text.contains(**k)).count();
        if count > best_count {
            best_count = count;
            best_slug = Some(*slug);
        }
    }

    if best_count >= CLASSIFY_THRESHOLD {
        best_slug
    } else {
        None
    }
}

/// Normalize a URL for dedup hashing: lowercase scheme+host+path, drop the
/// query string and fragment, trim trailing slashes. Never fails; an
/// unparseable URL falls back to naive prefix splitting.
pub fn normalize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            let mut normalized = match parsed.port() {
                Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, parsed.path()),
                None => format!("{}://{}{}", parsed.scheme(), host, parsed.path()),
            };
            normalized = normalized.trim_end_matches('/').to_string();
            normalized.to_lowercase()
        }
        Err(_) => {
            // Lossy, but must not fail.
            let without_query = url.split('?').next().unwrap_or(url);
            let without_fragment = without_query.split('#').next().unwrap_or(without_query);
            without_fragment.trim_end_matches('/').to_lowercase()
        }
    }
}

/// SHA-256 hex digest of the normalized URL.
pub fn dedup_hash(normalized_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_url.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_equivalence_class() {
        let a = normalize_url("https://EX.com/a/");
        let b = normalize_url("https://ex.com/a?x=1#y");
        let c = normalize_url("https://ex.com/a");

        assert_eq!(a, "https://ex.com/a");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(dedup_hash(&a), dedup_hash(&b));
    }

    #[test]
    fn ports_are_preserved() {
        assert_eq!(
            normalize_url("https://ex.com:8080/a?x=1"),
            "https://ex.com:8080/a"
        );
    }

    #[test]
    fn unparseable_url_falls_back_without_failing() {
        assert_eq!(
            normalize_url("Not a URL at all?q=1#frag///"),
            "not a url at all"
        );
    }

    #[test]
    fn hash_is_sha256_hex() {
        let hash = dedup_hash("https://ex.com/a");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn one_keyword_hit_is_not_enough() {
        assert_eq!(keyword_classify("the new smartphone arrived"), None);
    }

    #[test]
    fn two_keyword_hits_classify() {
        assert_eq!(
            keyword_classify("new smartphone software announced"),
            Some("technology")
        );
    }

    #[test]
    fn ties_resolve_to_first_category_in_table_order() {
        // Two technology hits and two sports hits; technology comes first.
        assert_eq!(
            keyword_classify("smartphone software at the basketball tournament"),
            Some("technology")
        );
    }
}

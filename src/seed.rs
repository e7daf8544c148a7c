use crate::types::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Starter categories backing classification and alert category filters.
const CATEGORIES: &[(&str, &str)] = &[
    ("top-stories", "Top Stories"),
    ("world", "World"),
    ("business", "Business"),
    ("technology", "Technology"),
    ("politics", "Politics"),
    ("science", "Science"),
    ("culture", "Culture"),
    ("sports", "Sports"),
    ("health", "Health"),
];

struct SeedSource {
    name: &'static str,
    slug: &'static str,
    url: &'static str,
    feed_url: &'static str,
    region: &'static str,
    category_hint: &'static str,
    tier: i64,
}

/// Starter set of RSS sources so a fresh database can run a fetch cycle
/// immediately.
const SOURCES: &[SeedSource] = &[
    SeedSource {
        name: "BBC News",
        slug: "bbc-news",
        url: "https://www.bbc.com/news",
        feed_url: "https://feeds.bbci.co.uk/news/rss.xml",
        region: "global",
        category_hint: "world",
        tier: 1,
    },
    SeedSource {
        name: "BBC World",
        slug: "bbc-world",
        url: "https://www.bbc.com/news/world",
        feed_url: "https://feeds.bbci.co.uk/news/world/rss.xml",
        region: "global",
        category_hint: "world",
        tier: 1,
    },
    SeedSource {
        name: "Al Jazeera",
        slug: "al-jazeera",
        url: "https://www.aljazeera.com",
        feed_url: "https://www.aljazeera.com/xml/rss/all.xml",
        region: "global",
        category_hint: "world",
        tier: 1,
    },
    SeedSource {
        name: "The Guardian",
        slug: "the-guardian",
        url: "https://www.theguardian.com",
        feed_url: "https://www.theguardian.com/world/rss",
        region: "global",
        category_hint: "world",
        tier: 1,
    },
    SeedSource {
        name: "NPR News",
        slug: "npr-news",
        url: "https://www.npr.org",
        feed_url: "https://feeds.npr.org/1001/rss.xml",
        region: "north-america",
        category_hint: "top-stories",
        tier: 2,
    },
];

/// Insert starter categories and sources, skipping anything already present.
pub async fn seed(pool: &PgPool) -> Result<()> {
    for (slug, name) in CATEGORIES {
        sqlx::query(
            "INSERT INTO categories (id, slug, name) VALUES ($1, $2, $3) ON CONFLICT (slug) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(name)
        .execute(pool)
        .await?;
    }
    info!("Seeded {} categories", CATEGORIES.len());

    for source in SOURCES {
        sqlx::query(
            r#"
            INSERT INTO sources (id, name, slug, url, feed_url, kind, region, language,
                                 category_hint, config, enabled, status)
            VALUES ($1, $2, $3, $4, $5, 'RSS', $6, 'en', $7, $8, true, 'ACTIVE')
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source.name)
        .bind(source.slug)
        .bind(source.url)
        .bind(source.feed_url)
        .bind(source.region)
        .bind(source.category_hint)
        .bind(serde_json::json!({ "tier": source.tier }))
        .execute(pool)
        .await?;
    }
    info!("Seeded {} sources", SOURCES.len());

    Ok(())
}

use super::FetchArticles;
use crate::fetcher::Fetcher;
use crate::types::{FetchConfig, IngestError, RawArticle, Result, Source};
use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// Stored article content is bounded to keep row sizes predictable.
const MAX_CONTENT_LENGTH: usize = 1000;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Adapter for RSS and Atom feeds.
pub struct RssAdapter {
    fetcher: Fetcher,
}

impl RssAdapter {
    pub fn new(config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
        })
    }

    /// Parse a feed document into raw articles, skipping entries without a
    /// link or a non-empty title.
    pub fn parse_feed(&self, body: &str) -> Result<Vec<RawArticle>> {
        let feed = parser::parse(body.as_bytes())
            .map_err(|e| IngestError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut articles = Vec::new();
        for entry in feed.entries {
            if let Some(article) = convert_entry(entry) {
                articles.push(article);
            }
        }

        debug!("Parsed feed with {} usable entries", articles.len());
        Ok(articles)
    }
}

#[async_trait]
impl FetchArticles for RssAdapter {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawArticle>> {
        let feed_url = source.feed_url.as_deref().unwrap_or(&source.url);
        info!("Fetching feed for source {} from {}", source.slug, feed_url);

        let body = self.fetcher.fetch_document(feed_url).await?;
        let articles = self.parse_feed(&body)?;

        info!("Source {}: {} articles from feed", source.slug, articles.len());
        Ok(articles)
    }
}

fn convert_entry(entry: Entry) -> Option<RawArticle> {
    let source_url = entry.links.first()?.href.clone();

    let title = entry.title.map(|t| t.content.trim().to_string())?;
    if title.is_empty() {
        return None;
    }

    let summary_html = entry.summary.map(|s| s.content);
    let summary = summary_html
        .as_deref()
        .map(plain_text_excerpt)
        .filter(|s| !s.is_empty());

    // Prefer the full content body, fall back to the raw summary markup.
    let content = entry
        .content
        .and_then(|c| c.body)
        .or(summary_html)
        .map(|c| truncate_chars(c.trim(), MAX_CONTENT_LENGTH))
        .filter(|c| !c.is_empty());

    let author = entry
        .authors
        .first()
        .map(|a| a.name.trim().to_string())
        .filter(|a| !a.is_empty());

    // feed-rs already degrades unparseable dates to None; a bad date never
    // fails the item.
    let published_at = entry.published;

    let image_url = extract_image(&entry.media, &entry.links);

    let tags: Vec<String> = entry
        .categories
        .into_iter()
        .map(|c| c.term.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Some(RawArticle {
        title,
        summary,
        content,
        author,
        published_at,
        source_url,
        image_url,
        tags,
    })
}

/// Best-available image, checked in fixed priority order: rich media
/// content, then thumbnail, then enclosure link.
fn extract_image(media: &[feed_rs::model::MediaObject], links: &[feed_rs::model::Link]) -> Option<String> {
    for object in media {
        for content in &object.content {
            if let Some(url) = &content.url {
                return Some(url.to_string());
            }
        }
    }

    for object in media {
        if let Some(thumbnail) = object.thumbnails.first() {
            return Some(thumbnail.image.uri.clone());
        }
    }

    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("enclosure"))
        .map(|l| l.href.clone())
}

/// Flatten feed markup into a plain-text excerpt: decode entities, strip
/// tags, collapse whitespace.
fn plain_text_excerpt(html: &str) -> String {
    let decoded = html_escape::decode_html_entities(html).to_string();
    let stripped = RE_TAGS.replace_all(&decoded, " ");
    RE_WS.replace_all(&stripped, " ").trim().to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchConfig;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example Wire</title>
    <item>
      <title>Breaking: markets tumble</title>
      <link>https://example.com/markets</link>
      <description>&lt;p&gt;Stocks fell &amp;amp; bonds rallied.&lt;/p&gt;</description>
      <media:thumbnail url="https://example.com/thumb.jpg"/>
      <category>business</category>
      <category>  </category>
      <author>jane@example.com (Jane Doe)</author>
    </item>
    <item>
      <title>   </title>
      <link>https://example.com/blank-title</link>
    </item>
    <item>
      <title>No link here</title>
    </item>
  </channel>
</rss>"#;

    fn adapter() -> RssAdapter {
        RssAdapter::new(FetchConfig::default()).unwrap()
    }

    #[test]
    fn skips_entries_without_link_or_title() {
        let articles = adapter().parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Breaking: markets tumble");
        assert_eq!(articles[0].source_url, "https://example.com/markets");
    }

    #[test]
    fn summary_is_plain_text() {
        let articles = adapter().parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(
            articles[0].summary.as_deref(),
            Some("Stocks fell & bonds rallied.")
        );
    }

    #[test]
    fn thumbnail_used_when_no_media_content() {
        let articles = adapter().parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(
            articles[0].image_url.as_deref(),
            Some("https://example.com/thumb.jpg")
        );
    }

    #[test]
    fn empty_tags_are_dropped() {
        let articles = adapter().parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(articles[0].tags, vec!["business".to_string()]);
    }

    #[test]
    fn content_is_bounded() {
        let long_body = "x".repeat(5000);
        let feed = format!(
            r#"<?xml version="1.0"?><rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"><channel><title>t</title><item><title>Long</title><link>https://example.com/long</link><content:encoded>{}</content:encoded></item></channel></rss>"#,
            long_body
        );
        let articles = adapter().parse_feed(&feed).unwrap();
        let content = articles[0].content.as_deref().unwrap();
        assert_eq!(content.chars().count(), MAX_CONTENT_LENGTH);
    }

    #[test]
    fn garbage_document_is_a_parse_error() {
        let err = adapter().parse_feed("this is not xml at all").unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn plain_text_excerpt_strips_markup() {
        let out = plain_text_excerpt("<p>Hello&nbsp;&amp; <b>world</b></p>");
        assert_eq!(out, "Hello & world");
    }
}

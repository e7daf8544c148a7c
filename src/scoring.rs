use crate::types::{RawArticle, SourceConfig};
use chrono::{DateTime, Utc};

/// Weighted terms that signal breaking news. A term found in the title earns
/// full weight; found only in the summary it earns half weight (floor).
/// Process-wide constant, safe to share across workers.
const KEYWORD_SCORES: &[(&str, i32)] = &[
    ("breaking", 30),
    ("urgent", 25),
    ("just in", 25),
    ("developing", 20),
    ("exclusive", 15),
    ("alert", 20),
    ("emergency", 25),
    ("crisis", 15),
    ("killed", 15),
    ("attack", 15),
    ("explosion", 20),
    ("earthquake", 20),
    ("tsunami", 25),
    ("war", 15),
    ("invasion", 20),
];

const MAX_SCORE: i32 = 100;

/// Breaking-news urgency score in 0..=100.
///
/// Three additive components: keyword weights, recency tiers, and source
/// tier. Pure and deterministic; `now` is passed in so the recency tiers can
/// be pinned in tests.
pub fn breaking_score(raw: &RawArticle, config: &SourceConfig, now: DateTime<Utc>) -> i32 {
    let score = keyword_score(raw) + recency_bonus(raw, now) + source_tier_bonus(config);
    score.min(MAX_SCORE)
}

/// Each term counts at most once: a title hit suppresses a redundant summary
/// hit for the same term.
fn keyword_score(raw: &RawArticle) -> i32 {
    let title = raw.title.to_lowercase();
    let summary = raw.summary.as_deref().unwrap_or("").to_lowercase();

    let mut score = 0;
    for (keyword, points) in KEYWORD_SCORES {
        if title.contains(keyword) {
            score += points;
        } else if summary.contains(keyword) {
            score += points / 2;
        }
    }
    score
}

/// Recency tiers: <30 min +15, <60 min +10, <180 min +5, otherwise +0.
/// A future timestamp counts as the most-recent tier.
fn recency_bonus(raw: &RawArticle, now: DateTime<Utc>) -> i32 {
    let Some(published_at) = raw.published_at else {
        return 0;
    };

    let age_minutes = (now - published_at).num_minutes();

    if age_minutes < 30 {
        // Covers negative ages too.
        15
    } else if age_minutes < 60 {
        10
    } else if age_minutes < 180 {
        5
    } else {
        0
    }
}

/// Tier 1 sources get +10, tier 2 get +5, anything else nothing.
fn source_tier_bonus(config: &SourceConfig) -> i32 {
    match config.tier {
        Some(1) => 10,
        Some(2) => 5,
        _ => 0,
    }
}

use crate::store::{AlertRuleStore, ArticleStore, NotificationStore};
use crate::types::{
    AlertRule, Article, NewNotification, NotificationChannel, NotificationStatus, Result,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Articles created within this trailing window are evaluated each pass.
const EVALUATION_WINDOW_MINUTES: i64 = 15;

/// Matches newly created articles against user alert rules and creates
/// in-app notifications.
pub struct AlertMatcher {
    articles: Arc<dyn ArticleStore>,
    rules: Arc<dyn AlertRuleStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl AlertMatcher {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        rules: Arc<dyn AlertRuleStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            articles,
            rules,
            notifications,
        }
    }

    /// Evaluate recent articles against every enabled rule. Returns the
    /// number of notifications created. Repeated passes over an unchanged
    /// window are idempotent.
    pub async fn evaluate_new_articles(&self) -> Result<usize> {
        let since = Utc::now() - Duration::minutes(EVALUATION_WINDOW_MINUTES);

        let recent = self.articles.created_since(since).await?;
        if recent.is_empty() {
            return Ok(0);
        }

        let rules = self.rules.list_enabled().await?;
        if rules.is_empty() {
            return Ok(0);
        }

        for rule in &rules {
            if rule.keywords.is_empty()
                && rule.category_ids.is_empty()
                && rule.min_breaking_score <= 0
            {
                // Matches every article; kept as-is pending a product
                // decision on default-deny.
                warn!("Alert rule {} ({}) has no predicates configured", rule.name, rule.id);
            }
        }

        let mut created = 0;

        for article in &recent {
            for rule in &rules {
                if !article_matches_rule(article, rule) {
                    continue;
                }

                let existing = self
                    .notifications
                    .find(article.id, rule.id, rule.user_id)
                    .await?;
                if existing.is_some() {
                    debug!(
                        "Notification already exists for article {} / rule {}",
                        article.id, rule.id
                    );
                    continue;
                }

                self.notifications
                    .create(NewNotification {
                        channel: NotificationChannel::InApp,
                        status: NotificationStatus::Pending,
                        user_id: rule.user_id,
                        article_id: article.id,
                        alert_rule_id: rule.id,
                    })
                    .await?;
                created += 1;
            }
        }

        info!(
            "Alert evaluation: {} articles x {} rules -> {} notifications",
            recent.len(),
            rules.len(),
            created
        );
        Ok(created)
    }
}

/// A match requires every configured predicate to hold; predicates left
/// unconfigured are skipped.
pub fn article_matches_rule(article: &Article, rule: &AlertRule) -> bool {
    if rule.min_breaking_score > 0 && article.breaking_score < rule.min_breaking_score {
        return false;
    }

    if !rule.category_ids.is_empty() {
        // An uncategorized article never satisfies a category filter.
        match article.category_id {
            Some(category_id) if rule.category_ids.contains(&category_id) => {}
            _ => return false,
        }
    }

    if !rule.keywords.is_empty() {
        let text = format!(
            "{} {}",
            article.title,
            article.summary.as_deref().unwrap_or_default()
        )
        .to_lowercase();

        let hit = rule
            .keywords
            .iter()
            .any(|keyword| text.contains(&keyword.to_lowercase()));
        if !hit {
            return false;
        }
    }

    true
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Section label that selects the breaking-news prompt instead of the per-section one.
pub const BREAKING_NEWS: &str = "Breaking News";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub headline: String,
    pub content: String,
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    pub section: String,
    pub published_at: DateTime<Utc>,
    /// Milliseconds since the epoch at creation.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implications: Option<String>,
}

impl Article {
    pub fn new(
        headline: &str,
        content: &str,
        keywords: Vec<String>,
        section: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let content = content.trim().to_string();
        Self {
            id: new_article_id(now),
            headline: headline.trim().to_string(),
            summary: summarize(&content),
            content,
            keywords,
            sources: Vec::new(),
            citations: Vec::new(),
            section: section.to_string(),
            published_at: now,
            timestamp: now.timestamp_millis(),
            expanded_content: None,
            additional_context: None,
            implications: None,
        }
    }

    /// Cited URLs double as the article's sources.
    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        self.sources = citations.clone();
        self.citations = citations;
        self
    }

    pub fn apply_expansion(&mut self, expanded: &ExpandedArticle) {
        self.expanded_content = Some(expanded.long_form_content.clone());
        self.additional_context = Some(expanded.additional_context.clone());
        self.implications = Some(expanded.implications.clone());
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded_content.is_some()
    }
}

/// A finished completion and the URLs the vendor cited for it, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub citations: Vec<String>,
}

impl From<String> for Completion {
    fn from(text: String) -> Self {
        Self {
            text,
            citations: Vec::new(),
        }
    }
}

/// Millisecond timestamp plus a short random suffix.
pub fn new_article_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.timestamp_millis(), &suffix[..8])
}

/// First two `.`-separated segments of the text, rejoined and closed with a period.
pub fn summarize(content: &str) -> String {
    let head: Vec<&str> = content.split('.').take(2).collect();
    format!("{}.", head.join(".").trim())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionData {
    pub articles: Vec<Article>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedArticle {
    pub long_form_content: String,
    pub additional_context: String,
    pub implications: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub timestamp: String,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsResponse {
    pub articles: Vec<NewsItem>,
}

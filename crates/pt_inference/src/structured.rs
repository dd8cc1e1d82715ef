use pt_core::{ChatMessage, Error, NewsResponse, Result};

use crate::content::ContentType;

pub const MAX_STRUCTURED_COUNT: usize = 20;

const STRUCTURED_SYSTEM_PROMPT: &str = "You are a news desk assistant. Respond with a single JSON \
object and nothing else. The object has an \"articles\" array; every element has the string \
fields \"headline\", \"summary\", \"timestamp\" (ISO 8601), \"section\" and optionally \"source\".";

/// Messages asking for `count` structured news items for a section.
pub fn structured_messages(kind: ContentType, section: &str, count: usize) -> Result<Vec<ChatMessage>> {
    let request = match kind {
        ContentType::Breaking => format!(
            "Generate {} of the most important breaking news stories from the last 24 hours. Use \"{}\" as the section.",
            count, section
        ),
        ContentType::Headlines => format!(
            "Generate {} current news stories for the {} section.",
            count, section
        ),
        other => {
            return Err(Error::Validation(format!(
                "Invalid type for structured news: '{}' (must be 'breaking' or 'headlines')",
                other
            )))
        }
    };

    Ok(vec![
        ChatMessage::system(STRUCTURED_SYSTEM_PROMPT),
        ChatMessage::user(request),
    ])
}

/// Validate model output against the `{ articles: [...] }` shape.
///
/// Models like to wrap JSON in a fenced code block, so a surrounding fence is
/// ignored.
pub fn parse_news_response(text: &str) -> Result<NewsResponse> {
    let body = strip_code_fence(text.trim());
    serde_json::from_str(body)
        .map_err(|e| Error::Parse(format!("Model returned malformed news JSON: {}", e)))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"articles":[{"headline":"Chip exports tighten","summary":"New rules.","timestamp":"2024-11-02T10:00:00Z","section":"Technology","source":"Reuters"}]}"#;

    #[test]
    fn test_parse_plain_json() {
        let response = parse_news_response(SAMPLE).unwrap();
        assert_eq!(response.articles.len(), 1);
        assert_eq!(response.articles[0].source.as_deref(), Some("Reuters"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", SAMPLE);
        let response = parse_news_response(&fenced).unwrap();
        assert_eq!(response.articles[0].section, "Technology");
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let err = parse_news_response(r#"{"articles":[{"headline":"x"}]}"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_structured_messages_reject_article_type() {
        assert!(structured_messages(ContentType::Article, "News", 3).is_err());
        let messages = structured_messages(ContentType::Headlines, "Sports", 4).unwrap();
        assert!(messages[1].content.contains("4 current news stories for the Sports section"));
    }
}

use pt_core::{ChatMessage, Completion, Error, Result, BREAKING_NEWS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a `/api/news` request asks the model for. Each variant owns its
/// system prompt and the rule that reshapes the raw completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Breaking,
    Headlines,
    #[default]
    Article,
    Keywords,
    Trending,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Breaking,
        ContentType::Headlines,
        ContentType::Article,
        ContentType::Keywords,
        ContentType::Trending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Breaking => "breaking",
            ContentType::Headlines => "headlines",
            ContentType::Article => "article",
            ContentType::Keywords => "keywords",
            ContentType::Trending => "trending",
        }
    }

    /// Headline type for a section; "Breaking News" gets its own prompt.
    pub fn for_section(section: &str) -> Self {
        if section == BREAKING_NEWS {
            ContentType::Breaking
        } else {
            ContentType::Headlines
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            ContentType::Breaking => {
                "You are a senior news editor at a major publication. Generate 5 of the most \
                 important and impactful news headlines from the last 24 hours globally. Focus on \
                 major developments, breaking news, and stories with significant impact. Format as \
                 a numbered list. Each headline should be different and cover distinct events."
            }
            ContentType::Headlines => {
                "You are an experienced news editor at a major publication. Generate 5 unique and \
                 diverse news headlines for the specified section. Each headline should cover a \
                 different topic or angle. Format each as a numbered list. Make the headlines \
                 catchy but informative. Ensure each headline is distinct and not redundant with \
                 others in the list."
            }
            ContentType::Article => {
                "You are a professional journalist writing for a major news publication. Write a \
                 comprehensive, well-researched article that maintains journalistic integrity and \
                 objectivity. Include relevant details, quotes if applicable, and maintain a \
                 professional tone throughout."
            }
            ContentType::Keywords => {
                "You are a content strategist. Analyze the provided article and extract 5-7 \
                 relevant keywords or key phrases that best represent its main topics and themes. \
                 Format as a comma-separated list."
            }
            ContentType::Trending => {
                "You are a news analyst tracking what people are reading right now. List the top 5 \
                 trending news topics. Format as a numbered list with one topic per line."
            }
        }
    }

    /// System prompt followed by the caller's messages.
    pub fn build_messages(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(ChatMessage::system(self.system_prompt()));
        full.extend_from_slice(messages);
        full
    }

    /// Reshape a completion; citations survive only on article text.
    pub fn post_process(&self, completion: Completion) -> ContentOutput {
        let Completion { text, citations } = completion;
        match self {
            ContentType::Breaking | ContentType::Headlines => ContentOutput::Headlines {
                headlines: parse_numbered_list(&text),
            },
            ContentType::Keywords => ContentOutput::Keywords {
                keywords: parse_comma_list(&text),
            },
            ContentType::Trending => ContentOutput::Topics {
                topics: parse_topic_list(&text),
            },
            ContentType::Article => ContentOutput::Text { text, citations },
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ContentType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                Error::Validation(
                    "Invalid type: must be 'breaking', 'headlines', 'article', 'keywords', or 'trending'"
                        .to_string(),
                )
            })
    }
}

/// Client-visible body of a successful `/api/news` call: one of
/// `{headlines}`, `{keywords}`, `{topics}` or `{text, citations?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentOutput {
    Headlines {
        headlines: Vec<String>,
    },
    Keywords {
        keywords: Vec<String>,
    },
    Topics {
        topics: Vec<String>,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        citations: Vec<String>,
    },
}

impl ContentOutput {
    pub fn into_list(self) -> Vec<String> {
        match self {
            ContentOutput::Headlines { headlines: items }
            | ContentOutput::Keywords { keywords: items }
            | ContentOutput::Topics { topics: items } => items,
            ContentOutput::Text { text, .. } => vec![text],
        }
    }
}

fn strip_numbering(line: &str, allow_paren: bool) -> Option<&str> {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix('.')
        .or_else(|| if allow_paren { rest.strip_prefix(')') } else { None })
}

/// Lines of the form `N. text`, numbering removed. Other lines are dropped.
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| strip_numbering(line, false))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Every non-blank line, with an optional `N.` or `N)` prefix removed.
pub fn parse_topic_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_numbering(line, true).unwrap_or(line))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn parse_comma_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Lowercased, trimmed, punctuation removed; used to spot near-identical headlines.
pub fn normalize_headline(headline: &str) -> String {
    headline
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect()
}

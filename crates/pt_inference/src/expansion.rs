use chrono::{DateTime, Utc};
use pt_core::{ChatMessage, ExpandedArticle};

const EXPAND_SYSTEM_PROMPT: &str = "You are a news researcher. Provide a detailed, well-structured \
article about the given headline. Include:\n\
1. A comprehensive overview of the news\n\
2. Key background information and context\n\
3. Analysis of implications and potential future impact\n\
Format the response in clear sections with markdown headings and appropriate spacing.";

pub fn expand_messages(headline: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(EXPAND_SYSTEM_PROMPT),
        ChatMessage::user(format!("Write a detailed article about: \"{}\"", headline)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Overview,
    Context,
    Implications,
}

fn heading_text(line: &str) -> Option<&str> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix('#') {
        return Some(clean_heading(rest.trim_start_matches('#')));
    }
    if line.len() > 4 && line.starts_with("**") && line.ends_with("**") {
        return Some(clean_heading(&line[2..line.len() - 2]));
    }
    // A short line ending in a colon only counts when it names a known section.
    if line.ends_with(':') && line.len() < 80 && !line.contains(". ") {
        let text = clean_heading(line);
        let lower = text.to_lowercase();
        if lower.contains("overview") || classify(text) != Part::Overview {
            return Some(text);
        }
    }
    None
}

fn clean_heading(text: &str) -> &str {
    text.trim().trim_end_matches(':').trim_matches('*').trim()
}

fn classify(heading: &str) -> Part {
    let heading = heading.to_lowercase();
    if ["implication", "impact", "future", "outlook", "what's next", "what next"]
        .iter()
        .any(|k| heading.contains(k))
    {
        Part::Implications
    } else if ["context", "background", "history"].iter().any(|k| heading.contains(k)) {
        Part::Context
    } else {
        Part::Overview
    }
}

/// Split a long-form expansion into overview, context and implications by
/// its section headings. Text before any recognised heading is overview.
pub fn split_expansion(text: &str, now: DateTime<Utc>) -> ExpandedArticle {
    let mut overview = Vec::new();
    let mut context = Vec::new();
    let mut implications = Vec::new();
    let mut current = Part::Overview;

    for line in text.lines() {
        if let Some(heading) = heading_text(line) {
            current = classify(heading);
            continue;
        }
        match current {
            Part::Overview => overview.push(line),
            Part::Context => context.push(line),
            Part::Implications => implications.push(line),
        }
    }

    ExpandedArticle {
        long_form_content: overview.join("\n").trim().to_string(),
        additional_context: context.join("\n").trim().to_string(),
        implications: implications.join("\n").trim().to_string(),
        last_updated: now,
    }
}

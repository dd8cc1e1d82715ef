use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use pt_core::{ChatMessage, Error, NewsResponse, BREAKING_NEWS};
use pt_inference::expansion::expand_messages;
use pt_inference::structured::{parse_news_response, structured_messages, MAX_STRUCTURED_COUNT};
use pt_inference::{ContentOutput, ContentType};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_STRUCTURED_COUNT: usize = 5;

fn parse_body(body: &Bytes, message: &str) -> ApiResult<Value> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
        .ok_or_else(|| Error::Validation(message.to_string()).into())
}

/// `type` defaults to `article`; anything that is not a known type string is rejected.
fn content_type_of(body: &Value) -> ApiResult<ContentType> {
    match body.get("type") {
        None | Some(Value::Null) => Ok(ContentType::default()),
        Some(Value::String(kind)) => Ok(kind.parse::<ContentType>()?),
        Some(_) => Err(Error::Validation(
            "Invalid type: must be 'breaking', 'headlines', 'article', 'keywords', or 'trending'"
                .to_string(),
        )
        .into()),
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "module": "pt_web",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /api/news`: `{ messages, type }` → headlines, keywords, topics or text.
pub async fn generate_news(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ContentOutput>> {
    const INVALID_MESSAGES: &str = "Invalid request: messages array is required";

    let body = parse_body(&body, INVALID_MESSAGES)?;
    let messages = body
        .get("messages")
        .filter(|m| m.is_array())
        .cloned()
        .ok_or_else(|| Error::Validation(INVALID_MESSAGES.to_string()))?;
    let messages: Vec<ChatMessage> = serde_json::from_value(messages).map_err(|_| {
        Error::Validation("Invalid request: each message needs a role and content".to_string())
    })?;
    let kind = content_type_of(&body)?;

    let provider = state.perplexity()?;

    tracing::info!(kind = %kind, messages = messages.len(), "generating content");
    let completion = provider
        .complete_cited(&kind.build_messages(&messages))
        .await
        .map_err(|e| {
            tracing::error!(kind = %kind, "API Error: {}", e);
            e
        })?;

    let output = match kind.post_process(completion) {
        ContentOutput::Headlines { headlines } => {
            let total = headlines.len();
            let fresh = state.recent_headlines.filter_new(headlines);
            tracing::debug!(total, fresh = fresh.len(), "filtered recently served headlines");
            ContentOutput::Headlines { headlines: fresh }
        }
        other => other,
    };

    Ok(Json(output))
}

/// `POST /api/news/structured`: `{ type, section, count }` → `{ articles }`.
pub async fn generate_structured(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<NewsResponse>> {
    let body = parse_body(&body, "Invalid request: JSON object body is required")?;
    let kind = content_type_of(&body)?;

    let section = match (kind, body.get("section").and_then(Value::as_str)) {
        (_, Some(section)) if !section.trim().is_empty() => section.trim().to_string(),
        (ContentType::Breaking, _) => BREAKING_NEWS.to_string(),
        _ => {
            return Err(Error::Validation("Invalid request: section is required".to_string()).into())
        }
    };

    let count = match body.get("count") {
        None | Some(Value::Null) => DEFAULT_STRUCTURED_COUNT,
        Some(value) => value
            .as_u64()
            .filter(|n| (1..=MAX_STRUCTURED_COUNT as u64).contains(n))
            .map(|n| n as usize)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Invalid request: count must be between 1 and {}",
                    MAX_STRUCTURED_COUNT
                ))
            })?,
    };

    let messages = structured_messages(kind, &section, count)?;
    let provider = state.xai()?;

    tracing::info!(kind = %kind, section = %section, count, "generating structured news");
    let text = provider.complete(&messages).await.map_err(|e| {
        tracing::error!(section = %section, "API Error: {}", e);
        e
    })?;
    let response = parse_news_response(&text).map_err(|e| {
        tracing::error!(section = %section, "structured response rejected: {}", e);
        e
    })?;

    Ok(Json(response))
}

/// `POST /api/expand`: `{ headline }` → streamed long-form text.
pub async fn expand_article(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Response> {
    const MISSING_HEADLINE: &str = "Invalid request: headline is required";

    let body = parse_body(&body, MISSING_HEADLINE)?;
    let headline = body
        .get("headline")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::Validation(MISSING_HEADLINE.to_string()))?
        .to_string();

    let provider = state.perplexity()?;

    let stream = provider
        .complete_stream(&expand_messages(&headline))
        .await
        .map_err(|e| {
            tracing::error!("Error in expand route: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to expand article")
        })?;

    tracing::info!(headline = %headline, "streaming expansion");
    let stream = stream.map(|chunk| {
        if let Err(e) = &chunk {
            tracing::error!("expansion stream failed: {}", e);
        }
        chunk.map(Bytes::from)
    });

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}

use async_stream::try_stream;
use futures_util::StreamExt;
use pt_core::{ChatMessage, Completion, Error, Result, TextStream};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::stream::{drain_sse_events, parse_stream_event, StreamEvent};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

/// Client for the OpenAI-compatible `chat/completions` surface both vendors expose.
pub struct CompatClient {
    client: Client,
    provider: String,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for CompatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatClient")
            .field("client", &"<reqwest::Client>")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl CompatClient {
    pub fn new(provider: &str, api_key: String, base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            provider: provider.to_string(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> Result<Response> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream,
        };

        tracing::debug!(
            provider = %self.provider,
            model = %self.model,
            messages = messages.len(),
            stream,
            "sending chat completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        Ok(response)
    }

    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(self.complete_cited(messages).await?.text)
    }

    /// Buffered completion plus the top-level `citations` array Perplexity attaches.
    pub async fn complete_cited(&self, messages: &[ChatMessage]) -> Result<Completion> {
        let response = self.send(messages, false).await?;
        let status = response.status();
        let body = response.text().await?;
        let data: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = data
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            tracing::warn!(provider = %self.provider, status = status.as_u16(), "upstream error: {}", message);
            return Err(Error::upstream(&self.provider, Some(status.as_u16()), message));
        }

        let data = data.ok_or_else(|| {
            Error::Parse(format!("Invalid response from {} API", self.provider))
        })?;
        Ok(Completion {
            text: extract_content(&self.provider, &data)?,
            citations: extract_citations(&data),
        })
    }

    pub async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        let response = self.send(messages, true).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(Error::upstream(&self.provider, Some(status.as_u16()), message));
        }

        let provider = self.provider.clone();
        let stream: TextStream = Box::pin(try_stream! {
            let mut body = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut done = false;

            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(Error::from)?;
                buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

                for event in drain_sse_events(&mut buffer) {
                    match parse_stream_event(&provider, &event)? {
                        StreamEvent::Delta(text) => yield text,
                        StreamEvent::Done => {
                            done = true;
                            break;
                        }
                        StreamEvent::Skip => {}
                    }
                }

                if done {
                    break;
                }
            }

            if !done {
                buffer.extend_from_slice(b"\n\n");
                for event in drain_sse_events(&mut buffer) {
                    match parse_stream_event(&provider, &event)? {
                        StreamEvent::Delta(text) => yield text,
                        StreamEvent::Done => break,
                        StreamEvent::Skip => {}
                    }
                }
            }
        });
        Ok(stream)
    }
}

/// Vendor error text: `error` as a string, else `error.message`.
pub fn error_message(data: &Value) -> Option<String> {
    match data.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Null => None,
        other => Some(
            other
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown API error")
                .to_string(),
        ),
    }
}

fn extract_content(provider: &str, data: &Value) -> Result<String> {
    if !data.is_object() {
        return Err(Error::Parse(format!("Invalid response from {} API", provider)));
    }

    if let Some(message) = error_message(data) {
        return Err(Error::upstream(provider, None, message));
    }

    data.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Parse(format!("Invalid response format from {} API", provider)))
}

/// Citation URLs, given either as plain strings or as objects with a `url`.
fn extract_citations(data: &Value) -> Vec<String> {
    data.get("citations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().or_else(|| item.get("url")?.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

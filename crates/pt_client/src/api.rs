use async_trait::async_trait;
use pt_core::{ChatMessage, Error, Result};
use pt_inference::{ContentOutput, ContentType};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

const SERVICE: &str = "News";

/// The route surface the generation service talks to.
#[async_trait]
pub trait NewsApi: Send + Sync {
    async fn generate_content(
        &self,
        kind: ContentType,
        messages: Vec<ChatMessage>,
    ) -> Result<ContentOutput>;

    /// Full text of a long-form expansion for `headline`.
    async fn expand(&self, headline: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ContentRequest {
    messages: Vec<ChatMessage>,
    #[serde(rename = "type")]
    kind: ContentType,
}

pub struct HttpNewsApi {
    client: Client,
    base_url: String,
}

impl fmt::Debug for HttpNewsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpNewsApi")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpNewsApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn error_field(data: &Value) -> Option<String> {
    data.get("error").and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl NewsApi for HttpNewsApi {
    async fn generate_content(
        &self,
        kind: ContentType,
        messages: Vec<ChatMessage>,
    ) -> Result<ContentOutput> {
        tracing::debug!(kind = %kind, url = %self.base_url, "requesting content");
        let response = self
            .client
            .post(format!("{}/api/news", self.base_url))
            .json(&ContentRequest { messages, kind })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        let data: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        if !status.is_success() {
            let message = error_field(&data).unwrap_or_else(|| {
                format!("Failed to generate content ({})", status.as_u16())
            });
            return Err(Error::upstream(SERVICE, Some(status.as_u16()), message));
        }
        if let Some(message) = error_field(&data) {
            return Err(Error::upstream(SERVICE, Some(status.as_u16()), message));
        }

        serde_json::from_value(data)
            .map_err(|e| Error::Parse(format!("Unexpected {} response: {}", kind, e)))
    }

    async fn expand(&self, headline: &str) -> Result<String> {
        tracing::debug!(headline, "requesting expansion");
        let response = self
            .client
            .post(format!("{}/api/expand", self.base_url))
            .json(&json!({ "headline": headline }))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(error_field)
                .unwrap_or_else(|| format!("Failed to expand article ({})", status.as_u16()));
            return Err(Error::upstream(SERVICE, Some(status.as_u16()), message));
        }
        Ok(body)
    }
}

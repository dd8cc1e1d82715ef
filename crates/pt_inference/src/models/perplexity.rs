use async_trait::async_trait;
use pt_core::{ChatMessage, ChatProvider, Completion, Error, Result, TextStream};
use std::fmt;

use super::compat::CompatClient;

pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";
pub const PERPLEXITY_MODEL: &str = "llama-3.1-sonar-large-128k-online";

pub struct PerplexityProvider {
    inner: CompatClient,
}

impl fmt::Debug for PerplexityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerplexityProvider")
            .field("inner", &self.inner)
            .finish()
    }
}

impl PerplexityProvider {
    pub fn new(api_key: Option<String>, base_url: Option<&str>) -> Result<Self> {
        let api_key = api_key.filter(|key| !key.trim().is_empty()).ok_or_else(|| {
            Error::Config("PERPLEXITY_API_KEY environment variable is not set".to_string())
        })?;
        Ok(Self {
            inner: CompatClient::new(
                "Perplexity",
                api_key,
                base_url.unwrap_or(PERPLEXITY_BASE_URL),
                PERPLEXITY_MODEL,
            ),
        })
    }
}

#[async_trait]
impl ChatProvider for PerplexityProvider {
    fn name(&self) -> &str {
        self.inner.provider()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.inner.complete(messages).await
    }

    async fn complete_cited(&self, messages: &[ChatMessage]) -> Result<Completion> {
        self.inner.complete_cited(messages).await
    }

    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        self.inner.complete_stream(messages).await
    }
}

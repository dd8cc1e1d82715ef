use async_trait::async_trait;
use pt_core::{ChatMessage, ChatProvider, Error, Result, TextStream};
use std::fmt;

use super::compat::CompatClient;

pub const XAI_BASE_URL: &str = "https://api.x.ai/v1";
pub const XAI_MODEL: &str = "grok-beta";

/// xAI's Grok models behind the OpenAI-compatible API surface
pub struct XaiProvider {
    inner: CompatClient,
}

impl fmt::Debug for XaiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XaiProvider").field("inner", &self.inner).finish()
    }
}

impl XaiProvider {
    pub fn new(api_key: Option<String>, base_url: Option<&str>) -> Result<Self> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("Missing XAI_API_KEY environment variable".to_string()))?;
        Ok(Self {
            inner: CompatClient::new("xAI", api_key, base_url.unwrap_or(XAI_BASE_URL), XAI_MODEL),
        })
    }
}

#[async_trait]
impl ChatProvider for XaiProvider {
    fn name(&self) -> &str {
        self.inner.provider()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.inner.complete(messages).await
    }

    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        self.inner.complete_stream(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_requires_api_key() {
        let err = XaiProvider::new(None, None).unwrap_err();
        assert_eq!(err.to_string(), "Missing XAI_API_KEY environment variable");

        let provider = XaiProvider::new(Some("xai-key".to_string()), Some("http://localhost:1")).unwrap();
        assert_eq!(provider.name(), "xAI");
    }
}

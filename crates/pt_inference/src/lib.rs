use pt_core::{Error, Result};
use url::Url;

pub mod content;
pub mod expansion;
pub mod models;
pub mod stream;
pub mod structured;

pub const PERPLEXITY_API_KEY_ENV: &str = "PERPLEXITY_API_KEY";
pub const XAI_API_KEY_ENV: &str = "XAI_API_KEY";
pub const PERPLEXITY_BASE_URL_ENV: &str = "PERPLEXITY_BASE_URL";
pub const XAI_BASE_URL_ENV: &str = "XAI_BASE_URL";

/// Provider credentials and endpoints. Missing keys are not an error here;
/// they surface as configuration errors when a route needs the provider.
#[derive(Clone, Default)]
pub struct InferenceConfig {
    pub perplexity_api_key: Option<String>,
    pub perplexity_base_url: Option<String>,
    pub xai_api_key: Option<String>,
    pub xai_base_url: Option<String>,
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("perplexity_api_key", &self.perplexity_api_key.as_deref().map(|_| "<redacted>"))
            .field("perplexity_base_url", &self.perplexity_base_url)
            .field("xai_api_key", &self.xai_api_key.as_deref().map(|_| "<redacted>"))
            .field("xai_base_url", &self.xai_base_url)
            .finish()
    }
}

impl InferenceConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            perplexity_api_key: var(PERPLEXITY_API_KEY_ENV),
            perplexity_base_url: var(PERPLEXITY_BASE_URL_ENV),
            xai_api_key: var(XAI_API_KEY_ENV),
            xai_base_url: var(XAI_BASE_URL_ENV),
        }
    }

    /// Reject base URL overrides that are not absolute http(s) URLs.
    pub fn validate(&self) -> Result<()> {
        for url in [&self.perplexity_base_url, &self.xai_base_url].into_iter().flatten() {
            let parsed = Url::parse(url)
                .map_err(|e| Error::Config(format!("Invalid provider base URL '{}': {}", url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "Provider base URL '{}' must use http or https",
                    url
                )));
            }
        }
        Ok(())
    }
}

pub mod prelude {
    pub use super::content::{ContentOutput, ContentType};
    pub use super::models::{create_perplexity, create_xai};
    pub use super::InferenceConfig;
    pub use pt_core::{ChatMessage, ChatProvider, Error, Result};
}

pub use content::{ContentOutput, ContentType};
pub use models::{create_perplexity, create_xai};

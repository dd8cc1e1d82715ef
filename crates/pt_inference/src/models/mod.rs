use pt_core::{ChatProvider, Result};
use std::sync::Arc;

use crate::InferenceConfig;

pub mod compat;
pub mod perplexity;
pub mod xai;

pub use perplexity::PerplexityProvider;
pub use xai::XaiProvider;

pub fn create_perplexity(config: &InferenceConfig) -> Result<Arc<dyn ChatProvider>> {
    let provider = PerplexityProvider::new(
        config.perplexity_api_key.clone(),
        config.perplexity_base_url.as_deref(),
    )?;
    tracing::info!("🧠 Perplexity provider configured");
    Ok(Arc::new(provider))
}

pub fn create_xai(config: &InferenceConfig) -> Result<Arc<dyn ChatProvider>> {
    let provider = XaiProvider::new(config.xai_api_key.clone(), config.xai_base_url.as_deref())?;
    tracing::info!("🧠 xAI provider configured");
    Ok(Arc::new(provider))
}

use pt_core::{ChatProvider, Error, Result};
use pt_inference::content::normalize_headline;
use pt_inference::{create_perplexity, create_xai, InferenceConfig};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

pub const MAX_RECENT_HEADLINES: usize = 100;

pub struct AppState {
    perplexity: Option<Arc<dyn ChatProvider>>,
    xai: Option<Arc<dyn ChatProvider>>,
    pub recent_headlines: RecentHeadlines,
}

impl AppState {
    pub fn new(perplexity: Option<Arc<dyn ChatProvider>>, xai: Option<Arc<dyn ChatProvider>>) -> Self {
        Self {
            perplexity,
            xai,
            recent_headlines: RecentHeadlines::new(MAX_RECENT_HEADLINES),
        }
    }

    /// Providers whose key is missing stay unset; routes needing them answer 401.
    pub fn from_config(config: &InferenceConfig) -> Self {
        let perplexity = create_perplexity(config)
            .map_err(|e| tracing::warn!("Perplexity provider unavailable: {}", e))
            .ok();
        let xai = create_xai(config)
            .map_err(|e| tracing::warn!("xAI provider unavailable: {}", e))
            .ok();
        Self::new(perplexity, xai)
    }

    pub fn perplexity(&self) -> Result<&Arc<dyn ChatProvider>> {
        self.perplexity.as_ref().ok_or_else(|| {
            Error::Config(
                "Perplexity API key is not configured. Please set PERPLEXITY_API_KEY in the environment."
                    .to_string(),
            )
        })
    }

    pub fn xai(&self) -> Result<&Arc<dyn ChatProvider>> {
        self.xai.as_ref().ok_or_else(|| {
            Error::Config(
                "xAI API key is not configured. Please set XAI_API_KEY in the environment.".to_string(),
            )
        })
    }
}

/// Headlines already handed out, compared after normalization. Oldest entries
/// are forgotten once `capacity` is exceeded.
pub struct RecentHeadlines {
    capacity: usize,
    inner: Mutex<RecentInner>,
}

#[derive(Default)]
struct RecentInner {
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl RecentHeadlines {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(RecentInner::default()),
        }
    }

    /// Keep only headlines not seen recently, and remember them.
    pub fn filter_new(&self, headlines: Vec<String>) -> Vec<String> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        headlines
            .into_iter()
            .filter(|headline| {
                let normalized = normalize_headline(headline);
                if !inner.seen.insert(normalized.clone()) {
                    return false;
                }
                inner.order.push_back(normalized);
                while inner.order.len() > self.capacity {
                    if let Some(oldest) = inner.order.pop_front() {
                        inner.seen.remove(&oldest);
                    }
                }
                true
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_headlines_filters_normalized_duplicates() {
        let recent = RecentHeadlines::new(10);
        let first = recent.filter_new(vec!["Markets rally".into(), "Storm hits".into()]);
        assert_eq!(first.len(), 2);

        let second = recent.filter_new(vec!["markets rally!".into(), "New story".into(), "New story".into()]);
        assert_eq!(second, vec!["New story".to_string()]);
        assert_eq!(recent.len(), 3);
    }

    #[test]
    fn test_recent_headlines_evicts_oldest() {
        let recent = RecentHeadlines::new(2);
        recent.filter_new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent.filter_new(vec!["a".into()]), vec!["a".to_string()]);
        assert!(recent.filter_new(vec!["c".into()]).is_empty());
    }

    #[test]
    fn test_missing_providers_are_config_errors() {
        let state = AppState::from_config(&InferenceConfig::default());
        assert!(matches!(state.perplexity(), Err(Error::Config(_))));
        assert!(matches!(state.xai(), Err(Error::Config(_))));
        assert!(state.recent_headlines.is_empty());
    }
}

use chrono::{DateTime, Utc};
use pt_core::config::STORE_KEY;
use pt_core::{
    Article, Clock, ExpandedArticle, NewsConfig, Result, SectionData, StateBackend, BREAKING_NEWS,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const STORE_VERSION: u32 = 0;

fn default_section() -> String {
    BREAKING_NEWS.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default)]
    pub sections: HashMap<String, SectionData>,
    #[serde(default)]
    pub saved_articles: Vec<Article>,
    #[serde(default)]
    pub expanded_articles: HashMap<String, ExpandedArticle>,
    #[serde(default = "default_section")]
    pub selected_section: String,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            sections: HashMap::new(),
            saved_articles: Vec::new(),
            expanded_articles: HashMap::new(),
            selected_section: default_section(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Persisted {
    state: StoreState,
    version: u32,
}

/// Per-section article lists, saved articles and expanded content, written
/// through to a [`StateBackend`] after every mutation.
pub struct NewsStore {
    state: RwLock<StoreState>,
    backend: Arc<dyn StateBackend>,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
    max_saved: usize,
}

impl NewsStore {
    /// Empty store; nothing is read from the backend.
    pub fn new(backend: Arc<dyn StateBackend>, clock: Arc<dyn Clock>, config: &NewsConfig) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            backend,
            clock,
            freshness_window: config.freshness_window,
            max_saved: config.max_saved_articles,
        }
    }

    /// Restore persisted state. Unreadable state is logged and discarded.
    pub async fn load(
        backend: Arc<dyn StateBackend>,
        clock: Arc<dyn Clock>,
        config: &NewsConfig,
    ) -> Result<Self> {
        let store = Self::new(backend, clock, config);
        if let Some(raw) = store.backend.load(STORE_KEY).await? {
            match serde_json::from_str::<Persisted>(&raw) {
                Ok(persisted) => {
                    tracing::debug!(
                        sections = persisted.state.sections.len(),
                        saved = persisted.state.saved_articles.len(),
                        "restored news store"
                    );
                    *store.state.write().await = persisted.state;
                }
                Err(e) => tracing::warn!("discarding unreadable news store: {}", e),
            }
        }
        Ok(store)
    }

    /// Apply `change` to a copy of the state; the copy replaces the live state
    /// only once it has been persisted.
    async fn mutate<R>(&self, change: impl FnOnce(&mut StoreState) -> R) -> Result<R> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let out = change(&mut next);
        self.persist(&next).await?;
        *state = next;
        Ok(out)
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        let raw = serde_json::to_string(&Persisted {
            state: state.clone(),
            version: STORE_VERSION,
        })?;
        self.backend.save(STORE_KEY, &raw).await
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Replace a section's articles wholesale.
    pub async fn set_articles(&self, section: &str, articles: Vec<Article>) -> Result<()> {
        let data = SectionData {
            articles: dedup_by_id(articles),
            last_updated: self.clock.now(),
        };
        self.mutate(|state| {
            state.sections.insert(section.to_string(), data);
        })
        .await
    }

    /// Merge articles into a section. Incoming articles go first, and any
    /// existing article sharing an id with one of them is dropped.
    pub async fn add_articles(&self, section: &str, articles: Vec<Article>) -> Result<()> {
        let now = self.clock.now();
        let incoming = dedup_by_id(articles);

        self.mutate(|state| {
            let ids: HashSet<&str> = incoming.iter().map(|a| a.id.as_str()).collect();
            let existing = state
                .sections
                .remove(section)
                .map(|data| data.articles)
                .unwrap_or_default();
            let kept: Vec<Article> = existing
                .into_iter()
                .filter(|a| !ids.contains(a.id.as_str()))
                .collect();

            let mut merged = incoming.clone();
            merged.extend(kept);
            state.sections.insert(
                section.to_string(),
                SectionData {
                    articles: merged,
                    last_updated: now,
                },
            );
        })
        .await
    }

    pub async fn get_articles_for_section(&self, section: &str) -> Vec<Article> {
        self.state
            .read()
            .await
            .sections
            .get(section)
            .map(|data| data.articles.clone())
            .unwrap_or_default()
    }

    pub async fn get_section_last_updated(&self, section: &str) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .sections
            .get(section)
            .map(|data| data.last_updated)
    }

    /// Sections that currently hold data.
    pub async fn section_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().await.sections.keys().cloned().collect();
        names.sort();
        names
    }

    /// True when the section is empty or its data is older than the freshness window.
    pub async fn needs_update(&self, section: &str) -> bool {
        let state = self.state.read().await;
        let Some(data) = state.sections.get(section) else {
            return true;
        };
        if data.articles.is_empty() {
            return true;
        }
        (self.clock.now() - data.last_updated)
            .to_std()
            .map(|age| age > self.freshness_window)
            .unwrap_or(false)
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Insert or replace by id, newest first. The oldest entries beyond the cap are dropped.
    pub async fn save_article(&self, article: Article) -> Result<()> {
        let max_saved = self.max_saved;
        self.mutate(|state| {
            state.saved_articles.retain(|a| a.id != article.id);
            state.saved_articles.insert(0, article);
            state.saved_articles.truncate(max_saved);
        })
        .await
    }

    /// Returns whether an entry was removed.
    pub async fn remove_article(&self, id: &str) -> Result<bool> {
        if !self.is_saved(id).await {
            return Ok(false);
        }
        self.mutate(|state| {
            let before = state.saved_articles.len();
            state.saved_articles.retain(|a| a.id != id);
            state.saved_articles.len() != before
        })
        .await
    }

    pub async fn is_saved(&self, id: &str) -> bool {
        self.state
            .read()
            .await
            .saved_articles
            .iter()
            .any(|a| a.id == id)
    }

    pub async fn saved_articles(&self) -> Vec<Article> {
        self.state.read().await.saved_articles.clone()
    }

    /// Look an article up by id across sections and the saved list.
    pub async fn find_article(&self, id: &str) -> Option<Article> {
        let state = self.state.read().await;
        state
            .sections
            .values()
            .flat_map(|data| data.articles.iter())
            .chain(state.saved_articles.iter())
            .find(|a| a.id == id)
            .cloned()
    }

    /// Store expanded content and patch every copy of the article that is held.
    pub async fn set_expanded(&self, id: &str, expanded: ExpandedArticle) -> Result<()> {
        self.mutate(|state| {
            for article in state
                .sections
                .values_mut()
                .flat_map(|data| data.articles.iter_mut())
                .filter(|a| a.id == id)
            {
                article.apply_expansion(&expanded);
            }
            for article in state.saved_articles.iter_mut().filter(|a| a.id == id) {
                article.apply_expansion(&expanded);
            }
            state.expanded_articles.insert(id.to_string(), expanded);
        })
        .await
    }

    pub async fn get_expanded(&self, id: &str) -> Option<ExpandedArticle> {
        self.state.read().await.expanded_articles.get(id).cloned()
    }

    pub async fn selected_section(&self) -> String {
        self.state.read().await.selected_section.clone()
    }

    pub async fn set_selected_section(&self, section: &str) -> Result<()> {
        self.mutate(|state| state.selected_section = section.to_string())
            .await
    }
}

fn dedup_by_id(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect()
}

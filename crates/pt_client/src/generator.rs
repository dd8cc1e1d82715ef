use pt_core::{
    Article, ChatMessage, Clock, Error, ExpandedArticle, Logger, NewsConfig, Result, BREAKING_NEWS,
};
use pt_inference::content::normalize_headline;
use pt_inference::expansion::split_expansion;
use pt_inference::{ContentOutput, ContentType};
use pt_storage::{NewsStore, TtlCache};
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::api::NewsApi;

/// Outcome of a generation that was not a hard failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation<T> {
    Completed(T),
    /// Superseded by a newer generation or cancelled explicitly.
    Cancelled,
}

impl<T> Generation<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Generation::Completed(value) => Some(value),
            Generation::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Generation::Cancelled)
    }
}

/// An article plus whether it came from the API rather than the cache.
struct Built {
    article: Article,
    fresh: bool,
}

/// Handle for one in-flight generation.
#[derive(Clone)]
struct Run {
    token: CancellationToken,
    epoch: u64,
}

#[derive(Default)]
struct Status {
    active: Option<Run>,
    last_error: Option<String>,
}

/// Drives headline, article and expansion generation against a [`NewsApi`]
/// and commits results to the [`NewsStore`]. At most one generation is live;
/// starting another cancels it.
pub struct NewsGenerator {
    api: Arc<dyn NewsApi>,
    store: Arc<NewsStore>,
    cache: TtlCache,
    clock: Arc<dyn Clock>,
    config: NewsConfig,
    status: Mutex<Status>,
    epoch: AtomicU64,
    commit_lock: tokio::sync::Mutex<()>,
    logger: Logger,
}

fn cache_key(headline: &str) -> String {
    format!("article-{}", headline.trim())
}

fn headline_prompt(section: &str) -> String {
    if section == BREAKING_NEWS {
        "Generate the most important news headlines from the last 24 hours".to_string()
    } else {
        format!("Generate current news headlines for the {} section", section)
    }
}

impl NewsGenerator {
    pub fn new(
        api: Arc<dyn NewsApi>,
        store: Arc<NewsStore>,
        cache: TtlCache,
        clock: Arc<dyn Clock>,
        config: NewsConfig,
    ) -> Self {
        Self {
            api,
            store,
            cache,
            clock,
            config,
            status: Mutex::new(Status::default()),
            epoch: AtomicU64::new(0),
            commit_lock: tokio::sync::Mutex::new(()),
            logger: Logger::new().with_prefix("generator"),
        }
    }

    pub fn store(&self) -> &Arc<NewsStore> {
        &self.store
    }

    fn status(&self) -> std::sync::MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_generating(&self) -> bool {
        self.status().active.is_some()
    }

    pub fn last_error(&self) -> Option<String> {
        self.status().last_error.clone()
    }

    /// Cancel whatever is in flight and clear loading and error state.
    pub fn cancel_generation(&self) {
        let mut status = self.status();
        if let Some(run) = status.active.take() {
            self.logger.info("cancelling active generation");
            run.token.cancel();
        }
        status.last_error = None;
    }

    fn begin(&self) -> Run {
        let mut status = self.status();
        if let Some(previous) = status.active.take() {
            self.logger.debug("superseding previous generation");
            previous.token.cancel();
        }
        let run = Run {
            token: CancellationToken::new(),
            epoch: self.epoch.fetch_add(1, Ordering::SeqCst) + 1,
        };
        status.active = Some(run.clone());
        status.last_error = None;
        run
    }

    fn is_current(&self, run: &Run) -> bool {
        !run.token.is_cancelled() && self.epoch.load(Ordering::SeqCst) == run.epoch
    }

    /// Clears loading state, records hard errors and maps cancellation to
    /// [`Generation::Cancelled`]. A superseded run never touches the status.
    fn settle<T>(&self, run: &Run, result: Result<T>) -> Result<Generation<T>> {
        let mut status = self.status();
        let current = status.active.as_ref().map(|r| r.epoch) == Some(run.epoch);

        match result {
            Ok(value) if current && !run.token.is_cancelled() => {
                status.active = None;
                Ok(Generation::Completed(value))
            }
            Ok(_) => Ok(Generation::Cancelled),
            Err(e) if e.is_cancelled() => {
                if current {
                    status.active = None;
                }
                Ok(Generation::Cancelled)
            }
            Err(e) if current => {
                self.logger.error(&format!("generation failed: {}", e));
                status.active = None;
                status.last_error = Some(e.to_string());
                Err(e)
            }
            Err(e) => {
                self.logger
                    .debug(&format!("ignoring failure of superseded generation: {}", e));
                Ok(Generation::Cancelled)
            }
        }
    }

    async fn call<T, F>(&self, run: &Run, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = run.token.cancelled() => Err(Error::Cancelled),
            result = request => result,
        }
    }

    /// Awaits `write` only if `run` is still the live generation.
    async fn commit<F>(&self, run: &Run, write: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let _guard = self.commit_lock.lock().await;
        if !self.is_current(run) {
            return Err(Error::Cancelled);
        }
        write.await
    }

    /// Collects at least `min_count` distinct headlines for `section`, giving
    /// up after the configured number of attempts.
    pub async fn generate_headlines(
        &self,
        section: &str,
        min_count: usize,
    ) -> Result<Generation<Vec<String>>> {
        let run = self.begin();
        let result = self.collect_headlines(&run, section, min_count).await;
        self.settle(&run, result)
    }

    async fn collect_headlines(
        &self,
        run: &Run,
        section: &str,
        min_count: usize,
    ) -> Result<Vec<String>> {
        let kind = ContentType::for_section(section);
        let prompt = headline_prompt(section);
        let logger = self.logger.clone().with_prefix(section);

        let mut headlines: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        let mut attempts = 0;

        while headlines.len() < min_count && attempts < self.config.max_headline_attempts {
            let output = self
                .call(
                    run,
                    self.api
                        .generate_content(kind, vec![ChatMessage::user(prompt.clone())]),
                )
                .await?;
            attempts += 1;

            let before = headlines.len();
            for headline in output.into_list() {
                if seen.insert(normalize_headline(&headline)) {
                    headlines.push(headline);
                }
            }
            logger.debug(&format!(
                "attempt {}: {} new headlines ({} total)",
                attempts,
                headlines.len() - before,
                headlines.len()
            ));
        }

        if headlines.len() < min_count {
            logger.warn(&format!(
                "only {} of {} headlines after {} attempts",
                headlines.len(),
                min_count,
                attempts
            ));
        }
        Ok(headlines)
    }

    /// Builds the article for `headline` (cached for a few minutes) and
    /// merges it into `section`.
    pub async fn generate_article(
        &self,
        headline: &str,
        section: &str,
    ) -> Result<Generation<Article>> {
        let run = self.begin();
        let result = self.article_run(&run, headline, section).await;
        self.settle(&run, result)
    }

    async fn article_run(&self, run: &Run, headline: &str, section: &str) -> Result<Article> {
        let built = self.build_article(run, headline, section).await?;
        self.commit(run, async {
            if built.fresh {
                self.cache.set(&cache_key(headline), &built.article).await?;
            }
            self.store
                .add_articles(section, vec![built.article.clone()])
                .await
        })
        .await?;
        Ok(built.article)
    }

    /// A cache hit keeps its original insertion time; only fresh articles
    /// are written back.
    async fn build_article(&self, run: &Run, headline: &str, section: &str) -> Result<Built> {
        if let Some(article) = self.cache.get::<Article>(&cache_key(headline)).await? {
            self.logger
                .debug(&format!("article cache hit for \"{}\"", headline.trim()));
            return Ok(Built {
                article,
                fresh: false,
            });
        }

        let (text, citations) = match self
            .call(
                run,
                self.api.generate_content(
                    ContentType::Article,
                    vec![ChatMessage::user(format!(
                        "Write a comprehensive news article for the headline: {}",
                        headline
                    ))],
                ),
            )
            .await?
        {
            ContentOutput::Text { text, citations } => (text, citations),
            other => {
                return Err(Error::Parse(format!(
                    "Expected article text, got {:?}",
                    other
                )))
            }
        };

        let keywords = self
            .call(
                run,
                self.api.generate_content(
                    ContentType::Keywords,
                    vec![ChatMessage::user(format!(
                        "Extract keywords from this article: {}",
                        text
                    ))],
                ),
            )
            .await?
            .into_list();

        Ok(Built {
            article: Article::new(headline, &text, keywords, section, self.clock.now())
                .with_citations(citations),
            fresh: true,
        })
    }

    /// Fresh headlines plus an article for each, replacing the section.
    pub async fn refresh_section(
        &self,
        section: &str,
        count: usize,
    ) -> Result<Generation<Vec<Article>>> {
        let run = self.begin();
        let result = self.refresh_run(&run, section, count).await;
        self.settle(&run, result)
    }

    async fn refresh_run(&self, run: &Run, section: &str, count: usize) -> Result<Vec<Article>> {
        let headlines = self.collect_headlines(run, section, count).await?;

        let mut built = Vec::with_capacity(count);
        for headline in headlines.iter().take(count) {
            built.push(self.build_article(run, headline, section).await?);
        }
        let articles: Vec<Article> = built.iter().map(|b| b.article.clone()).collect();

        self.commit(run, async {
            for b in built.iter().filter(|b| b.fresh) {
                self.cache.set(&cache_key(&b.article.headline), &b.article).await?;
            }
            self.store.set_articles(section, articles.clone()).await
        })
        .await?;
        self.logger.info(&format!(
            "refreshed {} with {} articles",
            section,
            articles.len()
        ));
        Ok(articles)
    }

    /// Long-form content for `article`, reusing a stored expansion if present.
    pub async fn expand_article(&self, article: &Article) -> Result<Generation<ExpandedArticle>> {
        if let Some(expanded) = self.store.get_expanded(&article.id).await {
            return Ok(Generation::Completed(expanded));
        }

        let run = self.begin();
        let result = self.expand_run(&run, article).await;
        self.settle(&run, result)
    }

    async fn expand_run(&self, run: &Run, article: &Article) -> Result<ExpandedArticle> {
        let text = self.call(run, self.api.expand(&article.headline)).await?;
        let expanded = split_expansion(&text, self.clock.now());
        self.commit(run, self.store.set_expanded(&article.id, expanded.clone()))
            .await?;
        Ok(expanded)
    }
}

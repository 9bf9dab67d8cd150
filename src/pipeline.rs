use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;

use crate::api::{MediaWikiClient, WikiApi};
use crate::category::Category;
use crate::config::Config;
use crate::content::ContentFetcher;
use crate::frequency::{ArticleStatsMap, FrequencyAggregator, FrequencyTable};
use crate::limiter::RateLimiter;
use crate::pages::PageEnumerator;
use crate::storage::{CachePayload, CacheStore};
use crate::text::TextNormalizer;

/// Where the frequencies of a run came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Source {
    Cache,
    FreshAnalysis,
    /// Computed from an interrupted crawl and never cached.
    Partial,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Cache => f.write_str("cache"),
            Source::FreshAnalysis => f.write_str("fresh analysis"),
            Source::Partial => f.write_str("partial analysis"),
        }
    }
}

/// The word frequencies of a category.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub category: Category,
    pub frequencies: FrequencyTable,
    /// Per article statistics, absent if they were not cached.
    pub article_stats: Option<ArticleStatsMap>,
    pub source: Source,
}

impl Analysis {
    /// The `n` most common words, see [`FrequencyTable::top`].
    pub fn top(&self, n: usize) -> Vec<(&str, u64)> {
        self.frequencies.top(n)
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Frequencies(Analysis),
    /// The category lists no articles.
    NoPages,
    /// None of the articles has any text.
    NoContent,
}

impl Outcome {
    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            Outcome::Frequencies(analysis) => Some(analysis),
            _ => None,
        }
    }

    pub fn into_analysis(self) -> Option<Analysis> {
        match self {
            Outcome::Frequencies(analysis) => Some(analysis),
            _ => None,
        }
    }
}

/// Crawls a category and computes its word frequencies, reusing whatever a
/// previous run left in the cache.
#[derive(Debug)]
pub struct Pipeline<A = MediaWikiClient> {
    api: A,
    store: CacheStore,
    limiter: RateLimiter,
    aggregator: FrequencyAggregator,
    config: Config,
}

impl Pipeline<MediaWikiClient> {
    /// A pipeline against the configured MediaWiki endpoint.
    pub fn new(config: Config) -> Result<Self> {
        let api = MediaWikiClient::new(&config)?;
        Ok(Pipeline::with_api(api, config))
    }
}

impl<A: WikiApi> Pipeline<A> {
    pub fn with_api(api: A, config: Config) -> Self {
        Self {
            api,
            store: CacheStore::new(config.cache_dir()),
            limiter: RateLimiter::new(config.request_delay()),
            aggregator: FrequencyAggregator::default(),
            config,
        }
    }

    /// Replaces the default normalizer, e.g. to use other stopwords.
    pub fn normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.aggregator = FrequencyAggregator::new(normalizer);
        self
    }

    #[inline]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[inline]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, category: &Category, force_refresh: bool) -> Outcome {
        self.run_until(category, force_refresh, None).await
    }

    /// Runs the pipeline, stopping content fetches once `cancel` is set.
    ///
    /// A cancelled run still aggregates what it fetched, but only a run that
    /// has content for every listed title persists its results. The next run
    /// resumes from the content cache.
    pub async fn run_until(
        &self,
        category: &Category,
        force_refresh: bool,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Outcome {
        if !force_refresh {
            if let Some(frequencies) = self.store.load_frequency(category) {
                log::info!("Using cached word frequency results for {:?}", category.name());
                return Outcome::Frequencies(Analysis {
                    category: category.clone(),
                    frequencies,
                    article_stats: self.store.load_article_stats(category),
                    source: Source::Cache,
                });
            }
        }

        let titles = PageEnumerator::new(&self.api, &self.store, &self.limiter, &self.config)
            .enumerate(category, force_refresh)
            .await;
        if titles.is_empty() {
            log::warn!("No pages found in category: {:?}", category.name());
            return Outcome::NoPages;
        }

        let mut fetcher = ContentFetcher::new(&self.api, &self.store, &self.limiter, &self.config);
        if let Some(cancel) = cancel {
            fetcher = fetcher.with_cancel(cancel);
        }
        let content = fetcher.fetch_all(category, &titles, force_refresh).await;
        let complete = titles.iter().all(|title| content.contains_key(title));
        if content.values().all(|text| text.trim().is_empty()) {
            log::warn!("No content extracted for category: {:?}", category.name());
            return Outcome::NoContent;
        }

        log::info!("Analyzing word frequencies of {} pages...", content.len());
        let (frequencies, article_stats) = self.aggregator.aggregate(&content);
        log::info!(
            "Found {} unique words in {:?}",
            frequencies.len(),
            category.name()
        );

        let source = if complete {
            self.store
                .save(category, &CachePayload::Frequency(frequencies.clone()));
            self.store
                .save(category, &CachePayload::ArticleStats(article_stats.clone()));
            Source::FreshAnalysis
        } else {
            log::warn!(
                "Not caching results for {:?}, {}/{} pages fetched",
                category.name(),
                content.len(),
                titles.len()
            );
            Source::Partial
        };

        Outcome::Frequencies(Analysis {
            category: category.clone(),
            frequencies,
            article_stats: Some(article_stats),
            source,
        })
    }
}

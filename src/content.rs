use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fnv::FnvHashSet;
use futures::{future, stream, StreamExt};

use crate::api::WikiApi;
use crate::category::Category;
use crate::config::Config;
use crate::frequency::ContentMap;
use crate::limiter::RateLimiter;
use crate::retry::execute_with_retry;
use crate::storage::{CachePayload, CacheStore};

/// Retrieves the text of articles, cache first, persisting as it goes.
#[derive(Debug)]
pub struct ContentFetcher<'a, A: ?Sized> {
    api: &'a A,
    store: &'a CacheStore,
    limiter: &'a RateLimiter,
    config: &'a Config,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, A: WikiApi + ?Sized> ContentFetcher<'a, A> {
    pub fn new(
        api: &'a A,
        store: &'a CacheStore,
        limiter: &'a RateLimiter,
        config: &'a Config,
    ) -> Self {
        Self {
            api,
            store,
            limiter,
            config,
            cancel: None,
        }
    }

    /// Stops issuing new fetches once the flag is set.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |cancel| cancel.load(Ordering::SeqCst))
    }

    /// Returns the content of all `titles`, plus any earlier cached content.
    ///
    /// Only titles missing from the cached map are fetched, with up to
    /// `concurrency` fetches in flight. The map is persisted after every
    /// `flush_every` completed fetches and once more at the end, so an
    /// interrupted run loses at most the fetches since the last flush.
    pub async fn fetch_all(
        &self,
        category: &Category,
        titles: &[String],
        force_refresh: bool,
    ) -> ContentMap {
        let mut content = if force_refresh {
            ContentMap::new()
        } else {
            let cached = self.store.load_content(category).unwrap_or_default();
            if !cached.is_empty() {
                log::info!("Loaded {} pages from content cache", cached.len());
            }
            cached
        };

        let mut queued = FnvHashSet::default();
        let mut missing = Vec::new();
        for title in titles {
            if !content.contains_key(title) && queued.insert(title.as_str()) {
                missing.push(title);
            }
        }
        if missing.is_empty() {
            return content;
        }

        log::info!("Fetching content for {} pages...", missing.len());
        let total = missing.len();
        let flush_every = self.config.flush_every();
        let mut completed = 0;

        let mut fetches = stream::iter(missing)
            .take_while(|_| future::ready(!self.is_cancelled()))
            .map(|title| async move {
                let text = self.fetch_one(title).await;
                (title, text)
            })
            .buffer_unordered(self.config.concurrency());

        while let Some((title, text)) = fetches.next().await {
            content.insert(title.clone(), text);
            completed += 1;

            if completed % flush_every == 0 {
                self.flush(category, &content);
                log::info!("Saved content cache ({}/{} pages processed)", completed, total);
            }
        }

        if self.is_cancelled() {
            log::warn!("Cancelled after {}/{} pages", completed, total);
        }
        if completed % flush_every != 0 {
            self.flush(category, &content);
        }
        content
    }

    /// Fetches a single article, an empty text if it has none or all
    /// attempts failed.
    pub async fn fetch_one(&self, title: &str) -> String {
        let api = self.api;
        let limiter = self.limiter;
        let what = format!("Content request for {:?}", title);

        let res = execute_with_retry(self.config.content_retry(), &what, move || async move {
            limiter.until_ready().await;
            api.extract(title).await
        })
        .await;

        match res {
            Ok(Some(text)) => {
                log::debug!("Fetched {:?} ({} characters)", title, text.len());
                text
            }
            Ok(None) => {
                log::info!("No content found for page: {:?}", title);
                String::new()
            }
            Err(e) => {
                log::warn!("Setting content for {:?} to empty: {}", title, e);
                String::new()
            }
        }
    }

    fn flush(&self, category: &Category, content: &ContentMap) {
        self.store
            .save(category, &CachePayload::Content(content.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockWikiApi;
    use crate::retry::RetryPolicy;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::{timeout, Instant};

    fn titles(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Article {:02}", i)).collect()
    }

    fn api_with(titles: &[String]) -> MockWikiApi {
        titles.iter().fold(MockWikiApi::new(), |api, title| {
            api.with_extract(title, Some(format!("Text of {}", title)))
        })
    }

    fn category() -> Category {
        Category::new("Jazz").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_only_missing() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let category = category();
        let titles = titles(3);
        let api = api_with(&titles);

        let mut cached = ContentMap::new();
        cached.insert(titles[0].clone(), "Cached text".to_string());
        cached.insert(titles[1].clone(), String::new());
        store.save(&category, &CachePayload::Content(cached));

        let config = Config::default();
        let limiter = RateLimiter::new(config.request_delay());
        let fetcher = ContentFetcher::new(&api, &store, &limiter, &config);

        let content = fetcher.fetch_all(&category, &titles, false).await;
        assert_eq!(api.extracted_titles(), vec![titles[2].clone()]);
        assert_eq!(content[&titles[0]], "Cached text");
        assert_eq!(content[&titles[1]], "");
        assert_eq!(content[&titles[2]], "Text of Article 02");
        assert_eq!(store.load_content(&category), Some(content.clone()));

        // everything cached, no requests and no delays
        let start = Instant::now();
        let again = fetcher.fetch_all(&category, &titles, false).await;
        assert_eq!(again, content);
        assert_eq!(api.extract_calls(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(0));

        // force refresh fetches everything again
        let refreshed = fetcher.fetch_all(&category, &titles, true).await;
        assert_eq!(api.extract_calls(), 4);
        assert_eq!(refreshed[&titles[0]], "Text of Article 00");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_stores_empty_text() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let category = category();
        let titles = titles(3);
        let api = api_with(&titles)
            .with_extract::<String>(&titles[1], None)
            .fail_extract(&titles[0], usize::MAX)
            .fail_extract(&titles[2], 2);
        let config = Config::builder()
            .request_delay(Duration::from_secs(0))
            .concurrency(1)
            .build();
        let limiter = RateLimiter::unlimited();

        let start = Instant::now();
        let content = ContentFetcher::new(&api, &store, &limiter, &config)
            .fetch_all(&category, &titles, false)
            .await;

        assert_eq!(content[&titles[0]], "");
        assert_eq!(content[&titles[1]], "");
        assert_eq!(content[&titles[2]], "Text of Article 02");
        // 3 attempts, 1 attempt, 3 attempts
        assert_eq!(api.extract_calls(), 7);
        // 1s + 2s backoff for each of the failing articles
        assert_eq!(start.elapsed(), Duration::from_secs(6));

        // a failed fetch is not retried on the next run
        ContentFetcher::new(&api, &store, &limiter, &config)
            .fetch_all(&category, &titles, false)
            .await;
        assert_eq!(api.extract_calls(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupted_run_keeps_last_flush() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let category = category();
        let titles = titles(30);
        let api = api_with(&titles);
        let config = Config::builder()
            .request_delay(Duration::from_millis(500))
            .content_retry(RetryPolicy::none())
            .concurrency(1)
            .build();
        let limiter = RateLimiter::new(config.request_delay());

        // fetches complete at 0s, 0.5s, ..., 11s: 23 done when aborted
        let fetcher = ContentFetcher::new(&api, &store, &limiter, &config);
        let res = timeout(
            Duration::from_millis(11_250),
            fetcher.fetch_all(&category, &titles, false),
        )
        .await;
        assert!(res.is_err());
        assert_eq!(api.extract_calls(), 23);

        let persisted = store.load_content(&category).unwrap();
        assert_eq!(persisted.len(), 20);

        // the next run only fetches what was not persisted
        let content = fetcher.fetch_all(&category, &titles, false).await;
        assert_eq!(content.len(), 30);
        assert_eq!(api.extract_calls(), 23 + 10);
        assert_eq!(store.load_content(&category).unwrap().len(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_fetches_share_the_rate_limit() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let category = category();
        let titles = titles(12);
        let api = api_with(&titles);
        let config = Config::builder()
            .request_delay(Duration::from_millis(500))
            .concurrency(4)
            .flush_every(5)
            .build();
        let limiter = RateLimiter::new(config.request_delay());

        let start = Instant::now();
        let content = ContentFetcher::new(&api, &store, &limiter, &config)
            .fetch_all(&category, &titles, false)
            .await;

        assert_eq!(content.len(), 12);
        assert_eq!(api.extract_calls(), 12);
        // eleven gaps of 500ms, regardless of concurrency
        assert_eq!(start.elapsed(), Duration::from_millis(5_500));
        assert_eq!(store.load_content(&category), Some(content));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_between_titles() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let category = category();
        let titles = titles(5);
        let api = api_with(&titles);
        let config = Config::builder()
            .request_delay(Duration::from_secs(0))
            .concurrency(1)
            .build();
        let limiter = RateLimiter::unlimited();
        let cancel = Arc::new(AtomicBool::new(true));

        let content = ContentFetcher::new(&api, &store, &limiter, &config)
            .with_cancel(cancel)
            .fetch_all(&category, &titles, false)
            .await;
        assert!(content.is_empty());
        assert_eq!(api.extract_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_flush_interval_and_concurrency() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let category = category();
        let titles = titles(3);
        let api = api_with(&titles);
        let config = Config::builder()
            .request_delay(Duration::from_secs(0))
            .flush_every(0)
            .concurrency(0)
            .build();
        assert_eq!(config.flush_every(), 1);
        assert_eq!(config.concurrency(), 1);
        let limiter = RateLimiter::unlimited();

        let content = ContentFetcher::new(&api, &store, &limiter, &config)
            .fetch_all(&category, &titles, false)
            .await;
        assert_eq!(content.len(), 3);
        assert_eq!(store.load_content(&category), Some(content));
    }
}

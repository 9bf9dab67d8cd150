use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory for cached artifacts.
    cache_dir: PathBuf,
    /// The api endpoint of the encyclopedia.
    api_endpoint: String,
    /// The user-agent used for requests.
    user_agent: String,
    /// Timeout for requests.
    request_timeout: Duration,
    /// Number of members requested per listing page.
    page_size: usize,
    /// Max. number of article titles collected for a category.
    max_pages: usize,
    /// Persist fetched content after this many completed fetches.
    flush_every: usize,
    /// Minimum spacing between two requests.
    request_delay: Duration,
    /// Number of article fetches in flight.
    concurrency: usize,
    /// Retries for category listing requests.
    page_retry: RetryPolicy,
    /// Retries for article content requests.
    content_retry: RetryPolicy,
    /// Number of words in reports.
    top_n: usize,
}

impl Config {
    /// Default timeout for requests made inside `catfreq`.
    pub const DEFAULT_REQ_TIMEOUT_SEC: u64 = 30;

    /// Largest listing page the api hands out.
    pub const MAX_PAGE_SIZE: usize = 500;

    pub const DEFAULT_API_ENDPOINT: &'static str = "https://en.wikipedia.org/w/api.php";

    /// Default user agent for `catfreq`.
    #[inline]
    pub(crate) fn default_user_agent() -> String {
        format!("catfreq/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Convenience method to create a [`ConfigBuilder`]
    #[inline]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
    #[inline]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    #[inline]
    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    #[inline]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Members requested per listing page, within `1..=MAX_PAGE_SIZE`.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Never zero.
    #[inline]
    pub fn flush_every(&self) -> usize {
        self.flush_every
    }

    #[inline]
    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    /// Never zero.
    #[inline]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[inline]
    pub fn page_retry(&self) -> &RetryPolicy {
        &self.page_retry
    }

    #[inline]
    pub fn content_retry(&self) -> &RetryPolicy {
        &self.content_retry
    }

    #[inline]
    pub fn top_n(&self) -> usize {
        self.top_n
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    cache_dir: Option<PathBuf>,
    api_endpoint: Option<String>,
    user_agent: Option<String>,
    request_timeout: Option<Duration>,
    page_size: Option<usize>,
    max_pages: Option<usize>,
    flush_every: Option<usize>,
    request_delay: Option<Duration>,
    concurrency: Option<usize>,
    page_retry: Option<RetryPolicy>,
    content_retry: Option<RetryPolicy>,
    top_n: Option<usize>,
}

impl ConfigBuilder {
    pub fn cache_dir<T: Into<PathBuf>>(mut self, cache_dir: T) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn api_endpoint<T: ToString>(mut self, api_endpoint: T) -> Self {
        self.api_endpoint = Some(api_endpoint.to_string());
        self
    }

    pub fn user_agent<T: ToString>(mut self, user_agent: T) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn flush_every(mut self, flush_every: usize) -> Self {
        self.flush_every = Some(flush_every);
        self
    }

    pub fn request_delay(mut self, request_delay: Duration) -> Self {
        self.request_delay = Some(request_delay);
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn page_retry(mut self, page_retry: RetryPolicy) -> Self {
        self.page_retry = Some(page_retry);
        self
    }

    pub fn content_retry(mut self, content_retry: RetryPolicy) -> Self {
        self.content_retry = Some(content_retry);
        self
    }

    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn build(self) -> Config {
        Config {
            cache_dir: self.cache_dir.unwrap_or_else(|| PathBuf::from("cache")),
            api_endpoint: self
                .api_endpoint
                .unwrap_or_else(|| Config::DEFAULT_API_ENDPOINT.to_string()),
            user_agent: self.user_agent.unwrap_or_else(Config::default_user_agent),
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(Config::DEFAULT_REQ_TIMEOUT_SEC)),
            page_size: self
                .page_size
                .unwrap_or(Config::MAX_PAGE_SIZE)
                .max(1)
                .min(Config::MAX_PAGE_SIZE),
            max_pages: self.max_pages.unwrap_or(40).max(1),
            flush_every: self.flush_every.unwrap_or(10).max(1),
            request_delay: self
                .request_delay
                .unwrap_or_else(|| Duration::from_millis(500)),
            concurrency: self.concurrency.unwrap_or(4).max(1),
            page_retry: self.page_retry.unwrap_or_else(RetryPolicy::listing),
            content_retry: self.content_retry.unwrap_or_else(RetryPolicy::content),
            top_n: self.top_n.unwrap_or(200).max(1),
        }
    }
}

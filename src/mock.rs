//! In-memory [`WikiApi`] for offline runs and tests, behind the `mock`
//! feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fnv::FnvHashMap;
use reqwest::StatusCode;

use crate::api::{Member, MemberPage, WikiApi};
use crate::category::Category;
use crate::error::CatfreqError;

/// Serves scripted listings and extracts, with injectable failures.
///
/// Listing cursors are the index of the next listing page.
#[derive(Debug, Default)]
pub struct MockWikiApi {
    /// Listing pages per category api title.
    listings: FnvHashMap<String, Vec<Vec<Member>>>,
    /// Extract per article title, `None` for an article without text.
    extracts: FnvHashMap<String, Option<String>>,
    /// Number of upcoming listing calls that fail.
    listing_failures: AtomicUsize,
    /// Listing calls fail once this many have been served.
    listing_fail_after: Option<usize>,
    /// Number of upcoming calls that fail, per article title.
    extract_failures: Mutex<FnvHashMap<String, usize>>,
    listing_calls: AtomicUsize,
    extract_calls: Mutex<Vec<String>>,
}

impl MockWikiApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a category whose listing is split into the given pages.
    pub fn with_category(mut self, category: &Category, pages: Vec<Vec<Member>>) -> Self {
        self.listings.insert(category.api_title(), pages);
        self
    }

    /// Adds a category with one listing page of articles, each with a text.
    pub fn with_articles(mut self, category: &Category, articles: &[(&str, &str)]) -> Self {
        let members = articles
            .iter()
            .map(|(title, _)| Member::new(title, 0))
            .collect();
        self.listings.insert(category.api_title(), vec![members]);
        for (title, text) in articles {
            self.extracts
                .insert(title.to_string(), Some(text.to_string()));
        }
        self
    }

    pub fn with_extract<T: ToString>(mut self, title: &str, text: Option<T>) -> Self {
        self.extracts
            .insert(title.to_string(), text.map(|t| t.to_string()));
        self
    }

    /// The next `n` listing calls fail with a transient error.
    pub fn fail_listing(self, n: usize) -> Self {
        self.listing_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Serves `n` listing calls, every later one fails with a transient error.
    pub fn fail_listing_after(mut self, n: usize) -> Self {
        self.listing_fail_after = Some(n);
        self
    }

    /// The next `n` extract calls for `title` fail with a transient error.
    pub fn fail_extract(self, title: &str, n: usize) -> Self {
        lock(&self.extract_failures).insert(title.to_string(), n);
        self
    }

    /// Number of listing calls served so far, failed ones included.
    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    /// Number of extract calls served so far, failed ones included.
    pub fn extract_calls(&self) -> usize {
        lock(&self.extract_calls).len()
    }

    /// Titles of all extract calls in call order.
    pub fn extracted_titles(&self) -> Vec<String> {
        lock(&self.extract_calls).clone()
    }

    /// Total number of remote calls.
    pub fn calls(&self) -> usize {
        self.listing_calls() + self.extract_calls()
    }

    fn unavailable() -> CatfreqError {
        CatfreqError::NoHttpSuccess {
            status: StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// The recorded state stays usable after a panicking test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl WikiApi for MockWikiApi {
    async fn category_members(
        &self,
        category: &Category,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<MemberPage, CatfreqError> {
        let served = self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .listing_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let exhausted = self.listing_fail_after.map_or(false, |n| served >= n);
        if failing || exhausted {
            return Err(MockWikiApi::unavailable());
        }

        let idx = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| CatfreqError::malformed(format!("bad cursor {:?}", cursor)))?,
            None => 0,
        };
        let pages = match self.listings.get(&category.api_title()) {
            Some(pages) => pages,
            None => return Ok(MemberPage::default()),
        };

        let members = pages
            .get(idx)
            .map(|page| page.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        let next_cursor = if idx + 1 < pages.len() {
            Some((idx + 1).to_string())
        } else {
            None
        };
        Ok(MemberPage {
            members,
            next_cursor,
        })
    }

    async fn extract(&self, title: &str) -> Result<Option<String>, CatfreqError> {
        lock(&self.extract_calls).push(title.to_string());
        {
            let mut failures = lock(&self.extract_failures);
            if let Some(n) = failures.get_mut(title) {
                if *n > 0 {
                    *n -= 1;
                    return Err(MockWikiApi::unavailable());
                }
            }
        }
        Ok(self.extracts.get(title).cloned().flatten())
    }
}

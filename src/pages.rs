use fnv::FnvHashSet;

use crate::api::WikiApi;
use crate::category::Category;
use crate::config::Config;
use crate::limiter::RateLimiter;
use crate::retry::execute_with_retry;
use crate::storage::{CachePayload, CacheStore};

/// Lists the articles of a category, cache first.
#[derive(Debug)]
pub struct PageEnumerator<'a, A: ?Sized> {
    api: &'a A,
    store: &'a CacheStore,
    limiter: &'a RateLimiter,
    config: &'a Config,
}

impl<'a, A: WikiApi + ?Sized> PageEnumerator<'a, A> {
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
        }
    }

    /// Returns the titles of the category's articles.
    ///
    /// A cached listing is returned without any request. Otherwise listing
    /// pages are followed until the last page or until `max_pages` titles are
    /// collected. A request that keeps failing ends the listing early with
    /// whatever was collected so far.
    pub async fn enumerate(&self, category: &Category, force_refresh: bool) -> Vec<String> {
        if !force_refresh {
            if let Some(titles) = self.store.load_pages(category) {
                log::info!(
                    "Using cached page list for {:?} ({} pages)",
                    category.name(),
                    titles.len()
                );
                return titles;
            }
        }

        log::info!("Fetching pages in {}...", category.api_title());
        let titles = self.fetch(category).await;

        if titles.is_empty() {
            log::info!("No pages found in category {:?}", category.name());
        } else {
            log::info!("Found {} pages in category {:?}", titles.len(), category.name());
            self.store
                .save(category, &CachePayload::Pages(titles.clone()));
        }
        titles
    }

    async fn fetch(&self, category: &Category) -> Vec<String> {
        let max_pages = self.config.max_pages();
        let mut titles = Vec::new();
        let mut seen = FnvHashSet::default();
        let mut cursor: Option<String> = None;

        loop {
            let api = self.api;
            let limiter = self.limiter;
            let limit = self.config.page_size();
            let current = cursor.as_deref();

            let page = execute_with_retry(self.config.page_retry(), "Category listing", move || {
                async move {
                    limiter.until_ready().await;
                    api.category_members(category, current, limit).await
                }
            })
            .await;

            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    log::warn!(
                        "Stopped listing {:?} after {} pages: {}",
                        category.name(),
                        titles.len(),
                        e
                    );
                    break;
                }
            };

            for member in page.members.into_iter().filter(|m| m.is_article()) {
                if titles.len() >= max_pages {
                    break;
                }
                if seen.insert(member.title.clone()) {
                    titles.push(member.title);
                }
            }
            log::debug!("Found {} pages so far...", titles.len());

            if titles.len() >= max_pages {
                log::info!("Limiting {:?} to {} pages", category.name(), max_pages);
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        titles
    }
}

//! Word frequency analysis of Wikipedia categories.
//!
//! Lists the articles of a category, downloads their plain text, filters it
//! and counts the remaining words. Every stage is cached on disk so repeated
//! runs for the same category are served without any network access.

pub use api::{MediaWikiClient, Member, MemberPage, WikiApi};
pub use category::Category;
pub use config::{Config, ConfigBuilder};
pub use content::ContentFetcher;
pub use error::CatfreqError;
pub use frequency::{ArticleStats, ContentMap, FrequencyAggregator, FrequencyTable};
pub use limiter::RateLimiter;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockWikiApi;
pub use pages::PageEnumerator;
pub use pipeline::{Analysis, Outcome, Pipeline, Source};
pub use report::Report;
pub use retry::{execute_with_retry, RetryPolicy};
pub use stopwords::StopWords;
pub use storage::{ArtifactKind, CachePayload, CacheStore};
pub use text::{TextNormalizer, Tokens};

pub mod api;
pub mod category;
pub mod config;
pub mod content;
mod error;
pub mod frequency;
pub mod limiter;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pages;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod stopwords;
pub mod storage;
pub mod text;

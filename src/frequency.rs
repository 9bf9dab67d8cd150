use std::collections::BTreeMap;

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

use crate::text::TextNormalizer;

/// Extracted text per article title.
///
/// An empty text means the article was fetched but has no content.
pub type ContentMap = BTreeMap<String, String>;

/// Statistics per article title.
pub type ArticleStatsMap = BTreeMap<String, ArticleStats>;

/// Statistic about words for a single article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStats {
    /// All the words.
    pub total_words: usize,
    /// Words that survived the filter.
    pub filtered_words: usize,
}

/// Count per token, remembering the order in which tokens were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, u64)>", into = "Vec<(String, u64)>")]
pub struct FrequencyTable {
    /// Tokens and their counts, in first-seen order.
    entries: Vec<(String, u64)>,
    /// Position of each token in `entries`.
    index: FnvHashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count of the token by one.
    pub fn add<T: AsRef<str>>(&mut self, token: T) {
        self.add_count(token, 1)
    }

    pub fn add_count<T: AsRef<str>>(&mut self, token: T, count: u64) {
        let token = token.as_ref();
        if let Some(idx) = self.index.get(token) {
            self.entries[*idx].1 += count;
        } else {
            self.index.insert(token.to_string(), self.entries.len());
            self.entries.push((token.to_string(), count));
        }
    }

    /// Adds all counts of `other`, new tokens are appended in their order.
    pub fn merge(&mut self, other: &FrequencyTable) {
        for (token, count) in other.iter() {
            self.add_count(token, count)
        }
    }

    pub fn get(&self, token: &str) -> Option<u64> {
        self.index.get(token).map(|idx| self.entries[*idx].1)
    }

    /// Number of distinct tokens.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// All tokens with their counts in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries
            .iter()
            .map(|(token, count)| (token.as_str(), *count))
    }

    /// The `n` most common tokens, ties are broken by first-seen order.
    ///
    /// `n` is clamped to `[1, self.len()]`, so an empty table yields nothing.
    pub fn top(&self, n: usize) -> Vec<(&str, u64)> {
        if self.is_empty() {
            return Vec::new();
        }
        let n = n.max(1).min(self.len());
        let mut ranked: Vec<_> = self.iter().collect();
        // stable, keeps first-seen order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Whether both tables hold the same counts regardless of token order.
    pub fn same_counts(&self, other: &FrequencyTable) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(token, count)| other.get(token) == Some(count))
    }
}

impl TryFrom<Vec<(String, u64)>> for FrequencyTable {
    type Error = String;

    fn try_from(entries: Vec<(String, u64)>) -> Result<Self, Self::Error> {
        let mut index = FnvHashMap::with_capacity_and_hasher(entries.len(), Default::default());
        for (idx, (token, _)) in entries.iter().enumerate() {
            if index.insert(token.clone(), idx).is_some() {
                return Err(format!("duplicate token {:?} in frequency table", token));
            }
        }
        Ok(Self { entries, index })
    }
}

impl From<FrequencyTable> for Vec<(String, u64)> {
    fn from(table: FrequencyTable) -> Self {
        table.entries
    }
}

impl<'a> std::iter::FromIterator<&'a str> for FrequencyTable {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut table = FrequencyTable::new();
        for token in iter {
            table.add(token);
        }
        table
    }
}

/// Counts tokens across all articles of a category.
#[derive(Debug, Clone, Default)]
pub struct FrequencyAggregator {
    normalizer: TextNormalizer,
}

impl FrequencyAggregator {
    pub fn new(normalizer: TextNormalizer) -> Self {
        Self { normalizer }
    }

    /// Counts a single article.
    pub fn article(&self, text: &str) -> (FrequencyTable, ArticleStats) {
        let tokens = self.normalizer.normalize(text);
        let stats = ArticleStats {
            total_words: tokens.total_words(),
            filtered_words: tokens.filtered_words(),
        };
        let table = tokens.filtered.iter().map(String::as_str).collect();
        (table, stats)
    }

    /// Builds the global table and the per article statistics.
    ///
    /// Articles are processed in the iteration order of `content`, which only
    /// affects the first-seen order of tokens, never their counts.
    pub fn aggregate<'a, I>(&self, content: I) -> (FrequencyTable, ArticleStatsMap)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut frequencies = FrequencyTable::new();
        let mut stats = ArticleStatsMap::new();

        for (title, text) in content {
            let (table, article_stats) = self.article(text);
            frequencies.merge(&table);
            log::debug!(
                "Counted {:?}: {} words, {} after filtering",
                title,
                article_stats.total_words,
                article_stats.filtered_words
            );
            stats.insert(title.clone(), article_stats);
        }

        (frequencies, stats)
    }
}

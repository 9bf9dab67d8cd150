use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::stopwords::{StopWords, DEFAULT_STOPWORDS};

lazy_static! {
    static ref RE_URL: Regex = Regex::new(r"https?://\S+").unwrap();
    static ref RE_CITATION: Regex = Regex::new(r"\[\d+\]").unwrap();
    static ref RE_TEMPLATE: Regex = Regex::new(r"\{\{.*?\}\}").unwrap();
    static ref RE_LINK: Regex = Regex::new(r"\[\[(?:[^|\]]*\|)?([^\]]*)\]\]").unwrap();
    static ref RE_NON_WORD: Regex = Regex::new(r"[^a-z0-9'\s]").unwrap();
    static ref RE_NUMERIC: Regex = Regex::new(r"^[\d.]+$").unwrap();
}

/// The few html entities that survive plain text extraction.
pub const HTML_ENTITIES: [(&str, &str); 4] =
    [("&nbsp;", " "), ("&amp;", "&"), ("&lt;", "<"), ("&gt;", ">")];

/// Shortest token that is counted.
pub const MIN_TOKEN_LEN: usize = 3;

/// Result of normalizing a text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    /// All the words before filtering.
    pub raw: Vec<String>,
    /// Words that survived the filter, in text order.
    pub filtered: Vec<String>,
}

impl Tokens {
    #[inline]
    pub fn total_words(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn filtered_words(&self) -> usize {
        self.filtered.len()
    }
}

/// Turns extracted article text into countable tokens.
///
/// Normalization is a pure function of the input and the stoplist.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    stopwords: Arc<StopWords>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        TextNormalizer::new(DEFAULT_STOPWORDS.clone())
    }
}

impl TextNormalizer {
    pub fn new(stopwords: Arc<StopWords>) -> Self {
        Self { stopwords }
    }

    #[inline]
    pub fn stopwords(&self) -> &StopWords {
        &self.stopwords
    }

    /// Splits the text into raw and filtered tokens.
    ///
    /// # Example
    ///
    /// ```rust
    ///  use catfreq::TextNormalizer;
    ///  let tokens = TextNormalizer::default()
    ///      .normalize("The Model won 3 awards in 2020 and it's notable.");
    ///  assert_eq!(tokens.filtered, vec!["model", "won", "awards", "notable"]);
    ///  assert_eq!(tokens.total_words(), 10);
    /// ```
    pub fn normalize(&self, raw_text: &str) -> Tokens {
        let text = TextNormalizer::clean(raw_text);

        let raw: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let filtered = raw
            .iter()
            .map(|word| word.trim_matches('\''))
            .filter(|word| self.is_countable(word))
            .map(str::to_string)
            .collect();

        Tokens { raw, filtered }
    }

    /// Lowercases and strips everything that is not a word character, an
    /// apostrophe or whitespace.
    pub fn clean(raw_text: &str) -> String {
        let mut text = raw_text.to_lowercase();
        for (entity, replacement) in HTML_ENTITIES.iter() {
            if text.contains(entity) {
                text = text.replace(entity, replacement);
            }
        }

        let text = RE_URL.replace_all(&text, "");
        let text = RE_CITATION.replace_all(&text, "");
        let text = RE_TEMPLATE.replace_all(&text, "");
        let text = RE_LINK.replace_all(&text, "$1");
        RE_NON_WORD.replace_all(&text, " ").into_owned()
    }

    /// Whether the (already apostrophe trimmed) word counts towards the
    /// frequency table.
    pub fn is_countable(&self, word: &str) -> bool {
        word.len() >= MIN_TOKEN_LEN && !self.stopwords.contains(word) && !is_numeric(word)
    }
}

/// Whether the word is a plain or decimal number.
pub fn is_numeric(word: &str) -> bool {
    RE_NUMERIC.is_match(word)
}

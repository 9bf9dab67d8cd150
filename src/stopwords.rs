use std::ops::Deref;
use std::sync::Arc;

use fnv::FnvHashSet;
use lazy_static::lazy_static;

/// Common english words.
const ENGLISH: &str = include_str!("../resources/stopwords/stopwords-en.txt");

/// Terms that show up on nearly every encyclopedia page regardless of topic.
const ENCYCLOPEDIA: &str = include_str!("../resources/stopwords/stopwords-encyclopedia.txt");

lazy_static! {
    /// The default stoplist, loaded once for the whole process.
    pub static ref DEFAULT_STOPWORDS: Arc<StopWords> = Arc::new(StopWords::english());
}

/// Words excluded from frequency counting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopWords {
    words: FnvHashSet<String>,
}

impl Deref for StopWords {
    type Target = FnvHashSet<String>;

    fn deref(&self) -> &Self::Target {
        &self.words
    }
}

impl StopWords {
    /// The standard english list plus the encyclopedia boilerplate list.
    pub fn english() -> Self {
        let mut words = StopWords::parse(ENGLISH);
        words.extend(StopWords::parse(ENCYCLOPEDIA).words);
        words
    }

    /// Reads a newline separated list, lines starting with `#` are ignored.
    pub fn parse(list: &str) -> Self {
        list.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_lowercase)
            .collect()
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, words: I) {
        self.words.extend(words)
    }
}

impl<S: Into<String>> std::iter::FromIterator<S> for StopWords {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            words: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_stopwords() {
        let stopwords = StopWords::english();
        assert!(stopwords.contains("the"));
        assert!(stopwords.contains("it's"));
        assert!(stopwords.contains("wikipedia"));
        assert!(stopwords.contains("isbn"));
        assert!(!stopwords.contains("won"));
        assert!(!stopwords.contains("model"));
    }

    #[test]
    fn parse_skips_comments() {
        let stopwords = StopWords::parse("# header\n\n Foo \nbar\n");
        assert_eq!(stopwords.len(), 2);
        assert!(stopwords.contains("foo"));
        assert!(stopwords.contains("bar"));
    }

    #[test]
    fn lazy_stopwords() {
        assert_eq!(**DEFAULT_STOPWORDS, StopWords::english());
    }
}

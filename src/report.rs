use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::frequency::ArticleStats;
use crate::pipeline::Analysis;

/// Suffix of the report file, prefixed by the category key.
pub const REPORT_SUFFIX: &str = "word_frequency.txt";

/// Human readable summary of an [`Analysis`].
#[derive(Debug, Clone)]
pub struct Report<'a> {
    analysis: &'a Analysis,
    top_n: usize,
    generated_at: DateTime<Local>,
}

impl<'a> Report<'a> {
    pub fn new(analysis: &'a Analysis, top_n: usize) -> Self {
        Self {
            analysis,
            top_n,
            generated_at: Local::now(),
        }
    }

    /// Overrides the timestamp written into the header.
    pub fn generated_at(mut self, generated_at: DateTime<Local>) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// `<key>_word_frequency.txt`
    pub fn file_name(&self) -> String {
        format!("{}_{}", self.analysis.category.key(), REPORT_SUFFIX)
    }

    /// Writes the report into `dir` and returns the path of the file.
    pub async fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.to_string())
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(path)
    }

    /// Articles by descending word count, ties in title order.
    fn sorted_stats(&self) -> Vec<(&str, ArticleStats)> {
        let mut stats: Vec<_> = self
            .analysis
            .article_stats
            .iter()
            .flatten()
            .map(|(title, stats)| (title.as_str(), *stats))
            .collect();
        stats.sort_by(|(_, a), (_, b)| b.total_words.cmp(&a.total_words));
        stats
    }
}

impl<'a> fmt::Display for Report<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Word frequency analysis for Wikipedia category: {}",
            self.analysis.category
        )?;
        writeln!(
            f,
            "Analysis date: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "Source: {}", self.analysis.source)?;
        writeln!(f)?;

        writeln!(
            f,
            "WORD FREQUENCIES (sorted by frequency - top {}):",
            self.top_n
        )?;
        writeln!(f, "==============================================")?;
        writeln!(f)?;
        for (word, count) in self.analysis.top(self.top_n) {
            writeln!(f, "{}: {}", word, count)?;
        }

        let stats = self.sorted_stats();
        let total: usize = stats.iter().map(|(_, s)| s.total_words).sum();
        let filtered: usize = stats.iter().map(|(_, s)| s.filtered_words).sum();

        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "ARTICLE STATISTICS:")?;
        writeln!(f, "===================")?;
        writeln!(f)?;
        writeln!(f, "Total articles analyzed: {}", stats.len())?;
        writeln!(f)?;
        writeln!(f, "Total words across all articles: {}", total)?;
        writeln!(f, "Total filtered words used for analysis: {}", filtered)?;
        writeln!(f)?;
        writeln!(f, "Per-article word counts:")?;
        writeln!(f, "-----------------------")?;
        for (title, stats) in stats {
            writeln!(
                f,
                "{}: {} words ({} after filtering)",
                title, stats.total_words, stats.filtered_words
            )?;
        }
        Ok(())
    }
}

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::category::Category;
use crate::frequency::{ArticleStatsMap, ContentMap, FrequencyTable};

/// The kinds of artifacts cached per category.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ArtifactKind {
    Pages,
    Content,
    Frequency,
    ArticleStats,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Pages,
        ArtifactKind::Content,
        ArtifactKind::Frequency,
        ArtifactKind::ArticleStats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Pages => "pages",
            ArtifactKind::Content => "content",
            ArtifactKind::Frequency => "frequency",
            ArtifactKind::ArticleStats => "article_stats",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached artifact, tagged with its kind so a load can validate its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CachePayload {
    Pages(Vec<String>),
    Content(ContentMap),
    Frequency(FrequencyTable),
    ArticleStats(ArticleStatsMap),
}

impl CachePayload {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            CachePayload::Pages(_) => ArtifactKind::Pages,
            CachePayload::Content(_) => ArtifactKind::Content,
            CachePayload::Frequency(_) => ArtifactKind::Frequency,
            CachePayload::ArticleStats(_) => ArtifactKind::ArticleStats,
        }
    }
}

/// File backed store with one entry per category and artifact kind.
///
/// Failures never reach the caller: an unreadable or malformed entry is
/// reported as a miss, a failed write as `false`. Entries are written to a
/// temporary file first and then renamed, so a reader sees either the old
/// or the new payload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new<T: AsRef<Path>>(dir: T) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the entry for the category and kind.
    pub fn path(&self, category: &Category, kind: ArtifactKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}.cache", category.key(), kind.as_str()))
    }

    pub fn exists(&self, category: &Category, kind: ArtifactKind) -> bool {
        self.path(category, kind).is_file()
    }

    /// Loads the entry, `None` if it is absent or can't be used.
    pub fn load(&self, category: &Category, kind: ArtifactKind) -> Option<CachePayload> {
        let path = self.path(category, kind);
        if !path.is_file() {
            log::debug!("Cache miss for {} {}", category.key(), kind);
            return None;
        }
        match CacheStore::read(&path) {
            Ok(payload) if payload.kind() == kind => {
                log::info!("Loaded {} from cache: {:?}", kind, path);
                Some(payload)
            }
            Ok(payload) => {
                log::warn!(
                    "Ignoring cache {:?}: expected {} but found {}",
                    path,
                    kind,
                    payload.kind()
                );
                None
            }
            Err(e) => {
                log::warn!("Ignoring unreadable cache {:?}: {:#}", path, e);
                None
            }
        }
    }

    /// Atomically replaces the entry for the payload's kind.
    pub fn save(&self, category: &Category, payload: &CachePayload) -> bool {
        let path = self.path(category, payload.kind());
        match self.write(&path, payload) {
            Ok(()) => {
                log::info!("Saved {} to cache: {:?}", payload.kind(), path);
                true
            }
            Err(e) => {
                log::warn!("Failed to save cache {:?}: {:#}", path, e);
                false
            }
        }
    }

    /// Deletes all entries of the category.
    pub fn clear(&self, category: &Category) {
        for kind in ArtifactKind::ALL.iter() {
            let path = self.path(category, *kind);
            if path.is_file() {
                if let Err(e) = fs::remove_file(&path) {
                    log::warn!("Failed to remove cache {:?}: {}", path, e);
                }
            }
        }
    }

    pub fn load_pages(&self, category: &Category) -> Option<Vec<String>> {
        match self.load(category, ArtifactKind::Pages)? {
            CachePayload::Pages(pages) => Some(pages),
            _ => None,
        }
    }

    pub fn load_content(&self, category: &Category) -> Option<ContentMap> {
        match self.load(category, ArtifactKind::Content)? {
            CachePayload::Content(content) => Some(content),
            _ => None,
        }
    }

    pub fn load_frequency(&self, category: &Category) -> Option<FrequencyTable> {
        match self.load(category, ArtifactKind::Frequency)? {
            CachePayload::Frequency(table) => Some(table),
            _ => None,
        }
    }

    pub fn load_article_stats(&self, category: &Category) -> Option<ArticleStatsMap> {
        match self.load(category, ArtifactKind::ArticleStats)? {
            CachePayload::ArticleStats(stats) => Some(stats),
            _ => None,
        }
    }

    fn read(path: &Path) -> Result<CachePayload> {
        let bytes = fs::read(path).context("Failed to read cache file")?;
        serde_json::from_slice(&bytes).context("Failed to parse cache payload")
    }

    fn write(&self, path: &Path, payload: &CachePayload) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir {:?}", self.dir))?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, payload)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)
            .with_context(|| format!("Failed to move cache into place {:?}", path))?;
        Ok(())
    }
}

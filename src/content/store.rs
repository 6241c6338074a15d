//! Content store - the flat directory of article files

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use super::article::Article;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content directory not found: {0:?}")]
    DirectoryNotFound(PathBuf),
    #[error("failed to list {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A directory of `*.md` articles
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
}

impl ContentStore {
    /// Open an existing content directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(StoreError::DirectoryNotFound(dir));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All `*.md` files directly inside the directory, sorted by filename
    pub fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| StoreError::Walk {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if entry.file_type().is_file() && is_markdown_file(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Load every article, skipping (and logging) unreadable files
    pub fn load_all(&self) -> Result<Vec<Article>, StoreError> {
        let mut articles = Vec::new();
        for path in self.list()? {
            match Article::load(&path) {
                Ok(article) => articles.push(article),
                Err(e) => tracing::warn!("Failed to load article {:?}: {:#}", path, e),
            }
        }
        Ok(articles)
    }

    /// Content ids already present: front-matter `contentId`, else the
    /// filename suffix
    pub fn existing_content_ids(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .load_all()?
            .iter()
            .filter_map(Article::content_id)
            .collect())
    }
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md")
        .unwrap_or(false)
}

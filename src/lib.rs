//! postkit: batch maintenance for Markdown article stores
//!
//! Articles live in one flat directory as `{date}-{contentId}.md` files with
//! a YAML front-matter block. This crate reassigns their dates in day-sized
//! buckets, repairs and retags front matter, removes duplicates, and keeps a
//! local cache of affiliate product data to write prompts from.

pub mod api;
pub mod commands;
pub mod config;
pub mod content;
pub mod helpers;
pub mod reassign;

use anyhow::Result;
use std::path::{Path, PathBuf};

use content::{ContentStore, StoreError};

/// Name of the optional configuration file in the base directory
pub const CONFIG_FILE: &str = "postkit.yml";

/// The main application: configuration plus resolved directories
#[derive(Debug, Clone)]
pub struct Postkit {
    /// Store configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Article directory
    pub content_dir: PathBuf,
    /// Cached API responses
    pub data_dir: PathBuf,
    /// Generated prompt files
    pub prompts_dir: PathBuf,
}

impl Postkit {
    /// Create a new instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            tracing::debug!("Loading config from {:?}", config_path);
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance with an explicit configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let content_dir = base_dir.join(&config.content_dir);
        let data_dir = base_dir.join(&config.data_dir);
        let prompts_dir = base_dir.join(&config.prompts_dir);

        Self {
            config,
            base_dir,
            content_dir,
            data_dir,
            prompts_dir,
        }
    }

    /// Open the content store; fails if the directory is missing
    pub fn store(&self) -> Result<ContentStore, StoreError> {
        ContentStore::open(&self.content_dir)
    }
}

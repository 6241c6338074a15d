//! Product records and the `data/*.json` cache format

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::ApiError;

/// One product, flattened from an API item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductRecord {
    pub rank: usize,
    pub content_id: String,
    pub title: String,
    pub url: String,
    pub affiliate_url: String,
    pub image_url: String,
    pub price: String,
    pub release_date: String,
    pub actress: Vec<String>,
    pub genre: Vec<String>,
    pub maker: String,
    /// Source storefront when not the product API (`MGS`)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service: String,
    /// Search word that found the product
    #[serde(skip_serializing_if = "String::is_empty")]
    pub search_keyword: String,
}

impl ProductRecord {
    /// Flatten one `result.items[]` entry
    pub fn from_item(item: &Value, rank: usize) -> Self {
        Self {
            rank,
            content_id: text_at(item, "/content_id"),
            title: text_at(item, "/title"),
            url: text_at(item, "/URL"),
            affiliate_url: text_at(item, "/affiliateURL"),
            image_url: text_at(item, "/imageURL/large"),
            price: text_at(item, "/prices/price"),
            release_date: text_at(item, "/date"),
            actress: names_at(item, "/iteminfo/actress"),
            genre: names_at(item, "/iteminfo/genre"),
            maker: names_at(item, "/iteminfo/maker")
                .into_iter()
                .next()
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Whether the title or any genre contains one of `words`, ignoring case
    pub fn matches_any(&self, words: &[String]) -> bool {
        let title = self.title.to_lowercase();
        let genres: Vec<String> = self.genre.iter().map(|g| g.to_lowercase()).collect();
        words.iter().any(|word| {
            let word = word.to_lowercase();
            title.contains(&word) || genres.iter().any(|g| g.contains(&word))
        })
    }
}

/// Flatten an ItemList response; ranks start at `first_rank`
pub fn flatten_items(response: &Value, first_rank: usize) -> Result<Vec<ProductRecord>, ApiError> {
    let items = response
        .pointer("/result/items")
        .and_then(Value::as_array)
        .ok_or(ApiError::UnexpectedResponse)?;

    Ok(items
        .iter()
        .enumerate()
        .map(|(i, item)| ProductRecord::from_item(item, first_rank + i))
        .collect())
}

fn text_at(item: &Value, pointer: &str) -> String {
    match item.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn names_at(item: &Value, pointer: &str) -> Vec<String> {
    item.pointer(pointer)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A cached fetch result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheFile {
    pub fetched_at: String,
    pub total_count: usize,
    #[serde(alias = "videos")]
    pub ranking: Vec<ProductRecord>,
}

impl CacheFile {
    pub fn new(ranking: Vec<ProductRecord>, fetched_at: DateTime<Local>) -> Self {
        Self {
            fetched_at: fetched_at.to_rfc3339(),
            total_count: ranking.len(),
            ranking,
        }
    }

    /// Load a cache file
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let content = fs::read_to_string(path).map_err(|source| ApiError::Cache {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the cache to one file, creating its directory
    pub fn write(&self, path: &Path) -> Result<(), ApiError> {
        let io_err = |path: &Path, source: io::Error| ApiError::Cache {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| io_err(path, e))
    }

    /// Write `{name}_{timestamp}.json` and `{name}_latest.json` into `dir`.
    /// Returns the timestamped path.
    pub fn save(&self, dir: &Path, name: &str, at: DateTime<Local>) -> Result<PathBuf, ApiError> {
        let stamped = dir.join(format!("{}_{}.json", name, at.format("%Y%m%d_%H%M%S")));
        self.write(&stamped)?;
        self.write(&latest_path(dir, name))?;
        Ok(stamped)
    }
}

/// `{dir}/{name}_latest.json`
pub fn latest_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}_latest.json", name))
}

//! Site configuration (postkit.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration for a content store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Directory
    pub content_dir: String,
    pub data_dir: String,
    pub prompts_dir: String,

    // Reassignment
    pub articles_per_day: usize,
    pub on_conflict: OnConflict,

    // Front matter
    pub tag_limit: usize,
    pub genre_marker: String,
    pub default_rating: f64,

    // Affiliate API
    pub default_data_name: String,
    pub request_delay_secs: u64,
    #[serde(default)]
    pub api: ApiConfig,

    // Text generation
    #[serde(default)]
    pub generation: GenerationConfig,

    // MGS scraping
    #[serde(default)]
    pub mgs: MgsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            data_dir: "data".to_string(),
            prompts_dir: "prompts".to_string(),

            articles_per_day: 10,
            on_conflict: OnConflict::Skip,

            tag_limit: 15,
            genre_marker: "**ジャンル:**".to_string(),
            default_rating: 4.0,

            default_data_name: "ranking".to_string(),
            request_delay_secs: 1,
            api: ApiConfig::default(),
            generation: GenerationConfig::default(),
            mgs: MgsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        if config.articles_per_day == 0 {
            anyhow::bail!("articles_per_day must be greater than zero");
        }
        Ok(config)
    }
}

/// What to do when a rename target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OnConflict {
    /// Leave the article on its old date
    Skip,
    /// Replace the existing file
    Overwrite,
}

/// Product lookup endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub site: String,
    pub service: String,
    pub floor: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.dmm.com/affiliate/v3/ItemList".to_string(),
            site: "FANZA".to_string(),
            service: "digital".to_string(),
            floor: "videoa".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Text-generation endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL; the request goes to `{endpoint}/{model}:generateContent`
    pub endpoint: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    /// Category name to threshold, sent as the safety settings
    pub safety: Vec<SafetySetting>,
    pub max_retries: usize,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Pause between two prompts
    pub request_delay_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    fn new(category: &str, threshold: &str) -> Self {
        Self {
            category: category.to_string(),
            threshold: threshold.to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-flash-latest".to_string(),
            temperature: 0.9,
            top_p: 0.95,
            top_k: 40,
            safety: vec![
                SafetySetting::new("HARM_CATEGORY_HARASSMENT", "BLOCK_NONE"),
                SafetySetting::new("HARM_CATEGORY_HATE_SPEECH", "BLOCK_NONE"),
                SafetySetting::new("HARM_CATEGORY_SEXUALLY_EXPLICIT", "BLOCK_ONLY_HIGH"),
                SafetySetting::new("HARM_CATEGORY_DANGEROUS_CONTENT", "BLOCK_NONE"),
            ],
            max_retries: 3,
            base_delay_secs: 15,
            max_delay_secs: 120,
            request_delay_secs: 5,
            timeout_secs: 120,
        }
    }
}

/// Second affiliate site (HTML scraping)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MgsConfig {
    pub base_url: String,
    /// Search words used when none are given on the command line
    pub keywords: Vec<String>,
    pub pages: u32,
    pub page_delay_secs: u64,
    pub keyword_delay_secs: u64,
    /// Written inside `data_dir`
    pub output_file: String,
    pub timeout_secs: u64,
}

impl Default for MgsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.mgstage.com".to_string(),
            keywords: ["人妻", "熟女", "NTR", "ネトラレ", "ドラマ", "主婦"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            pages: 5,
            page_delay_secs: 2,
            keyword_delay_secs: 3,
            output_file: "mgs_scraped_data.json".to_string(),
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.content_dir, "content");
        assert_eq!(config.articles_per_day, 10);
        assert_eq!(config.tag_limit, 15);
        assert_eq!(config.on_conflict, OnConflict::Skip);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
content_dir: posts
articles_per_day: 20
on_conflict: overwrite
api:
  floor: video
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.content_dir, "posts");
        assert_eq!(config.articles_per_day, 20);
        assert_eq!(config.on_conflict, OnConflict::Overwrite);
        assert_eq!(config.api.floor, "video");
        assert_eq!(config.api.site, "FANZA");
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.generation.model, "gemini-flash-latest");
        assert_eq!(config.mgs.pages, 5);
    }

    #[test]
    fn test_parse_generation_and_mgs() {
        let yaml = r#"
generation:
  model: gemini-pro
  max_retries: 5
  safety:
    - category: HARM_CATEGORY_HARASSMENT
      threshold: BLOCK_ONLY_HIGH
mgs:
  keywords: [ドラマ]
  pages: 2
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.generation.model, "gemini-pro");
        assert_eq!(config.generation.max_retries, 5);
        assert_eq!(config.generation.top_k, 40);
        assert_eq!(config.generation.safety.len(), 1);
        assert_eq!(config.mgs.keywords, vec!["ドラマ"]);
        assert_eq!(config.mgs.pages, 2);
        assert_eq!(config.mgs.output_file, "mgs_scraped_data.json");
    }

    #[test]
    fn test_load_rejects_zero_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postkit.yml");
        fs::write(&path, "articles_per_day: 0\n").unwrap();
        assert!(SiteConfig::load(&path).is_err());
    }
}

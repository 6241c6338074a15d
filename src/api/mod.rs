//! Remote services: affiliate product lookup (DMM ItemList API), the MGS
//! storefront, and text generation

pub mod gemini;
pub mod mgs;
mod record;
pub mod retry;

pub use gemini::GeminiClient;
pub use mgs::MgsClient;
pub use record::{flatten_items, latest_path, CacheFile, ProductRecord};
pub use retry::{BackoffPolicy, RetryDisposition};

use reqwest::StatusCode;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing credential: set {0} in the environment or .env")]
    MissingCredential(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API response has no result.items array")]
    UnexpectedResponse,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cache file {path:?}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("blocked: {0}")]
    Blocked(String),
    #[error("response carried no text")]
    EmptyResponse,
    #[error("invalid URL {0}")]
    InvalidUrl(String),
    #[error("invalid selector: {0}")]
    Selector(String),
}

impl ApiError {
    /// Error for a non-success response
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match retry::classify_status(status, &body) {
            RetryDisposition::QuotaExceeded => ApiError::QuotaExceeded(body),
            _ => ApiError::Status {
                status: status.as_u16(),
                body,
            },
        }
    }

    pub fn disposition(&self) -> RetryDisposition {
        match self {
            ApiError::Http(e) => retry::classify_reqwest_error(e),
            ApiError::Status { status, body } => StatusCode::from_u16(*status)
                .map(|s| retry::classify_status(s, body))
                .unwrap_or(RetryDisposition::NonRetryable),
            ApiError::QuotaExceeded(_) => RetryDisposition::QuotaExceeded,
            ApiError::EmptyResponse => RetryDisposition::Retryable,
            _ => RetryDisposition::NonRetryable,
        }
    }
}

/// API id and affiliate id
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_id: String,
    pub affiliate_id: String,
}

impl Credentials {
    /// Read `DMM_API_ID` and `DMM_AFFILIATE_ID`
    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self {
            api_id: require_env("DMM_API_ID")?,
            affiliate_id: require_env("DMM_AFFILIATE_ID")?,
        })
    }
}

pub(crate) fn require_env(key: &'static str) -> Result<String, ApiError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::MissingCredential(key))
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Sort {
    Rank,
    Date,
    Price,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Rank => "rank",
            Sort::Date => "date",
            Sort::Price => "price",
        }
    }
}

/// One ItemList request
#[derive(Debug, Clone)]
pub struct ItemQuery {
    pub keyword: Option<String>,
    pub content_id: Option<String>,
    pub sort: Sort,
    pub hits: u32,
    /// 1-based
    pub offset: u32,
}

/// Thin client over the ItemList endpoint
pub struct DmmClient {
    client: reqwest::Client,
    config: ApiConfig,
    credentials: Credentials,
}

impl DmmClient {
    pub fn new(config: ApiConfig, credentials: Credentials) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("postkit/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    /// Query parameters for a request, credentials included
    pub fn params(&self, query: &ItemQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_id", self.credentials.api_id.clone()),
            ("affiliate_id", self.credentials.affiliate_id.clone()),
            ("site", self.config.site.clone()),
            ("service", self.config.service.clone()),
            ("floor", self.config.floor.clone()),
        ];
        if let Some(keyword) = &query.keyword {
            params.push(("keyword", keyword.clone()));
        }
        if let Some(cid) = &query.content_id {
            params.push(("cid", cid.clone()));
        }
        params.push(("sort", query.sort.as_str().to_string()));
        params.push(("hits", query.hits.to_string()));
        params.push(("offset", query.offset.to_string()));
        params.push(("output", "json".to_string()));
        params
    }

    /// Request URL with the credentials masked, for logging
    pub fn masked_url(&self, query: &ItemQuery) -> String {
        let params: Vec<(&str, String)> = self
            .params(query)
            .into_iter()
            .map(|(k, v)| match k {
                "api_id" => (k, "***API_ID***".to_string()),
                "affiliate_id" => (k, "***AFFILIATE_ID***".to_string()),
                _ => (k, v),
            })
            .collect();
        match reqwest::Url::parse_with_params(&self.config.endpoint, &params) {
            Ok(url) => url.to_string(),
            Err(_) => self.config.endpoint.clone(),
        }
    }

    /// Fetch one page of results as raw JSON
    pub async fn item_list(&self, query: &ItemQuery) -> Result<Value, ApiError> {
        tracing::info!("GET {}", self.masked_url(query));

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&self.params(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

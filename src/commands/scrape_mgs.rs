//! Scrape MGS search results into a cache file

use anyhow::{Context, Result};
use chrono::Local;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use super::fetch::select_records;
use crate::api::mgs::{self, MgsClient};
use crate::api::{CacheFile, ProductRecord};
use crate::Postkit;

#[derive(Debug, Clone, Default)]
pub struct ScrapeArgs {
    /// Search words (defaults to the config list)
    pub keywords: Vec<String>,
    pub pages: Option<u32>,
    /// Also fetch each product page for cast, genres and maker
    pub details: bool,
    pub exclude_existing: bool,
}

/// Append `found` to `records`, dropping content ids already seen.
/// Records without an id get `mgs_{n}`; ranks follow collection order.
pub fn collect_unique(
    records: &mut Vec<ProductRecord>,
    seen: &mut HashSet<String>,
    found: Vec<ProductRecord>,
) -> usize {
    let before = records.len();
    for mut record in found {
        if record.content_id.is_empty() {
            record.content_id = format!("mgs_{}", records.len() + 1);
        }
        if !seen.insert(record.content_id.clone()) {
            continue;
        }
        record.rank = records.len() + 1;
        records.push(record);
    }
    records.len() - before
}

/// Run the scrape-mgs command; returns the written cache file
pub async fn run(postkit: &Postkit, args: ScrapeArgs) -> Result<PathBuf> {
    let config = &postkit.config.mgs;
    let affiliate_id = mgs::affiliate_id_from_env()?;
    let client = MgsClient::new(config.clone())?;
    let keywords = if args.keywords.is_empty() {
        config.keywords.clone()
    } else {
        args.keywords
    };
    let pages = args.pages.unwrap_or(config.pages).max(1);
    let page_delay = Duration::from_secs(config.page_delay_secs);
    let keyword_delay = Duration::from_secs(config.keyword_delay_secs);

    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for (i, keyword) in keywords.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(keyword_delay).await;
        }
        tracing::info!("Searching MGS for {:?}", keyword);

        for page in 1..=pages {
            if page > 1 {
                tokio::time::sleep(page_delay).await;
            }
            let url = client.search_url(keyword, page)?;
            let html = match client.fetch_page(url.as_str()).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("{:?} page {}: {}, moving on", keyword, page, e);
                    break;
                }
            };
            let found = mgs::parse_listing(&html, client.base_url(), &affiliate_id, keyword)?;
            if found.is_empty() {
                tracing::info!("{:?} page {}: no products", keyword, page);
                break;
            }
            let added = collect_unique(&mut records, &mut seen, found);
            tracing::info!("{:?} page {}: {} new products", keyword, page, added);
        }
    }

    if args.details {
        for (i, record) in records.iter_mut().enumerate() {
            if i > 0 {
                tokio::time::sleep(page_delay).await;
            }
            let detail = match client.fetch_page(&record.url).await {
                Ok(html) => mgs::parse_detail(&html)?,
                Err(e) => {
                    tracing::warn!("{}: {}", record.content_id, e);
                    continue;
                }
            };
            detail.merge_into(record);
        }
    }

    let existing = if args.exclude_existing {
        postkit.store()?.existing_content_ids()?
    } else {
        HashSet::new()
    };
    let scraped = records.len();
    let records = select_records(records, &[], &existing);
    println!("Scraped {} products, kept {}", scraped, records.len());

    let path = postkit.data_dir.join(&config.output_file);
    CacheFile::new(records, Local::now())
        .write(&path)
        .with_context(|| format!("writing {:?}", path))?;
    println!("Saved {}", path.display());
    Ok(path)
}

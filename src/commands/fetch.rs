//! Fetch product data from the affiliate API into the data directory

use anyhow::{Context, Result};
use chrono::Local;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{flatten_items, CacheFile, Credentials, DmmClient, ItemQuery, ProductRecord, Sort};
use crate::Postkit;

#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub keyword: Option<String>,
    pub content_id: Option<String>,
    pub sort: Sort,
    pub hits: u32,
    pub offset: u32,
    pub pages: u32,
    pub filter: Vec<String>,
    pub exclude_existing: bool,
    pub name: Option<String>,
}

/// Drop records that fail the keyword filter or already have an article
pub fn select_records(
    records: Vec<ProductRecord>,
    filter: &[String],
    existing: &HashSet<String>,
) -> Vec<ProductRecord> {
    records
        .into_iter()
        .filter(|r| filter.is_empty() || r.matches_any(filter))
        .filter(|r| !existing.contains(&r.content_id))
        .collect()
}

/// Run the fetch command; returns the timestamped cache file
pub async fn run(postkit: &Postkit, args: FetchArgs) -> Result<PathBuf> {
    let credentials = Credentials::from_env()?;
    let client = DmmClient::new(postkit.config.api.clone(), credentials)?;
    let delay = Duration::from_secs(postkit.config.request_delay_secs);

    let mut records = Vec::new();
    for page in 0..args.pages.max(1) {
        if page > 0 {
            tokio::time::sleep(delay).await;
        }

        let query = ItemQuery {
            keyword: args.keyword.clone(),
            content_id: args.content_id.clone(),
            sort: args.sort,
            hits: args.hits,
            offset: args.offset + page * args.hits,
        };
        let response = client
            .item_list(&query)
            .await
            .with_context(|| format!("fetching page {}", page + 1))?;
        let page_records = flatten_items(&response, records.len() + 1)?;
        tracing::info!("Page {}: {} items", page + 1, page_records.len());

        let exhausted = page_records.len() < args.hits as usize;
        records.extend(page_records);
        if exhausted {
            break;
        }
    }

    let existing = if args.exclude_existing {
        postkit.store()?.existing_content_ids()?
    } else {
        HashSet::new()
    };
    let fetched = records.len();
    let records = select_records(records, &args.filter, &existing);
    println!("Fetched {} items, kept {}", fetched, records.len());

    let name = args
        .name
        .clone()
        .unwrap_or_else(|| postkit.config.default_data_name.clone());
    let now = Local::now();
    let path = CacheFile::new(records, now).save(&postkit.data_dir, &name, now)?;
    println!("Saved {:?}", path);

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> ProductRecord {
        ProductRecord {
            content_id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_records() {
        let records = vec![record("a1", "Drama"), record("b2", "Drama two"), record("c3", "Other")];
        let existing: HashSet<String> = ["b2".to_string()].into_iter().collect();
        let kept = select_records(records.clone(), &["drama".to_string()], &existing);
        assert_eq!(kept, vec![record("a1", "Drama")]);

        let all = select_records(records, &[], &HashSet::new());
        assert_eq!(all.len(), 3);
    }
}

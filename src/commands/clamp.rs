//! Move articles dated in the future back to today

use anyhow::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::article::{article_file_name, content_id_from_filename, replace_date_field};
use crate::content::Article;
use crate::helpers::format_ymd;
use crate::Postkit;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClampReport {
    pub fixed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Clamp every future-dated article to `today`
pub fn run(postkit: &Postkit, today: NaiveDate) -> Result<ClampReport> {
    let store = postkit.store()?;
    let mut report = ClampReport::default();

    tracing::info!("Clamping future dates to {}", format_ymd(today));

    for path in store.list()? {
        match clamp_one(&path, today) {
            Ok(Some(target)) => {
                report.fixed += 1;
                println!(
                    "  {} -> {}",
                    path.file_name().unwrap_or_default().to_string_lossy(),
                    target.file_name().unwrap_or_default().to_string_lossy()
                );
            }
            Ok(None) => report.skipped += 1,
            Err(e) => {
                report.failed += 1;
                tracing::error!("Failed {:?}: {:#}", path, e);
            }
        }
    }

    println!(
        "Fixed: {}, skipped: {}, failed: {}",
        report.fixed, report.skipped, report.failed
    );
    Ok(report)
}

/// Returns the new path when the article was moved
fn clamp_one(path: &Path, today: NaiveDate) -> Result<Option<PathBuf>> {
    let article = Article::load(path)?;
    let (mut fm, body) = match article.front_matter() {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Skipping {}: {}", article.file_name, e);
            return Ok(None);
        }
    };

    let Some(date) = fm.parse_date() else {
        return Ok(None);
    };
    if date <= today {
        return Ok(None);
    }

    let (mut content, replaced) = replace_date_field(&article.raw, today);
    if !replaced {
        fm.set_str("date", &format_ymd(today));
        content = fm.render(body);
    }

    let content_id = fm
        .content_id()
        .or_else(|| content_id_from_filename(&article.file_name))
        .unwrap_or_else(|| article.file_name.trim_end_matches(".md").to_string());

    let target = free_target(path, today, &content_id);
    fs::write(&target, content)?;
    if target != path {
        fs::remove_file(path)?;
    }

    Ok(Some(target))
}

/// `{date}-{id}.md`, or `{date}-{id}-N.md` when another file holds the name
fn free_target(current: &Path, date: NaiveDate, content_id: &str) -> PathBuf {
    let mut target = current.with_file_name(article_file_name(date, content_id));
    let mut counter = 1;
    while target.exists() && target != current {
        let name = article_file_name(date, &format!("{}-{}", content_id, counter));
        target = current.with_file_name(name);
        counter += 1;
    }
    target
}

//! Tag maintenance: add, remove, list, and pull genres out of article bodies

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

use crate::content::{quote, split, Article};
use crate::Postkit;

lazy_static! {
    /// A `tags:` line plus any block-list items under it
    static ref TAGS_LINE: Regex = Regex::new(r"(?m)^tags:[^\n]*\n(?:[ \t]*-[ \t][^\n]*\n)*").unwrap();
}

/// Separator between genres on the marker line
pub const GENRE_SEPARATOR: char = '、';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReport {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Genre frequencies, most common first (from-genres only)
    pub genre_counts: Vec<(String, usize)>,
}

/// Append `extra` to `existing`, dropping blanks and duplicates, capped at `limit`
pub fn merge_tags(existing: &[String], extra: &[String], limit: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for tag in existing.iter().chain(extra) {
        let tag = tag.trim();
        if !tag.is_empty() && !merged.iter().any(|t| t == tag) {
            merged.push(tag.to_string());
        }
    }
    merged.truncate(limit);
    merged
}

/// Genres listed after `marker` on the first body line that carries it
pub fn extract_genres(body: &str, marker: &str) -> Vec<String> {
    let Some(line) = body.lines().find(|line| line.contains(marker)) else {
        return Vec::new();
    };
    let Some((_, genres)) = line.split_once(marker) else {
        return Vec::new();
    };
    genres
        .split(GENRE_SEPARATOR)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace the `tags:` entry of a document, leaving every other byte alone.
/// Inserts the entry before the closing delimiter when there is none.
pub fn rewrite_tags(raw: &str, tags: &[String]) -> Result<String> {
    let (_, body) = split(raw)?;
    let head = &raw[..raw.len() - body.len()];

    let rendered: Vec<String> = tags.iter().map(|t| quote(t)).collect();
    let line = format!("tags: [{}]\n", rendered.join(", "));

    let new_head = if TAGS_LINE.is_match(head) {
        TAGS_LINE
            .replacen(head, 1, regex::NoExpand(&line))
            .into_owned()
    } else {
        match head.rfind("\n---") {
            Some(idx) => format!("{}\n{}{}", &head[..idx], line.trim_end(), &head[idx..]),
            None => anyhow::bail!("front matter has no closing delimiter"),
        }
    };

    Ok(format!("{}{}", new_head, body))
}

/// Add tags to every article
pub fn add(postkit: &Postkit, tags: &[String]) -> Result<TagReport> {
    let limit = postkit.config.tag_limit;
    let report = for_each_article(postkit, |current, _| {
        Some(merge_tags(current, tags, limit))
    })?;
    print_report(&report);
    Ok(report)
}

/// Remove tags from every article
pub fn remove(postkit: &Postkit, tags: &[String]) -> Result<TagReport> {
    let report = for_each_article(postkit, |current, _| {
        Some(
            current
                .iter()
                .filter(|t| !tags.iter().any(|r| r.trim() == t.trim()))
                .cloned()
                .collect(),
        )
    })?;
    print_report(&report);
    Ok(report)
}

/// Merge the genres listed in each article body into its tags
pub fn from_genres(postkit: &Postkit) -> Result<TagReport> {
    let marker = postkit.config.genre_marker.clone();
    let limit = postkit.config.tag_limit;
    let mut counts: HashMap<String, usize> = HashMap::new();

    let mut report = for_each_article(postkit, |current, body| {
        let genres = extract_genres(body, &marker);
        if genres.is_empty() {
            return None;
        }
        for genre in &genres {
            *counts.entry(genre.clone()).or_insert(0) += 1;
        }
        Some(merge_tags(current, &genres, limit))
    })?;

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    report.genre_counts = counts;

    print_report(&report);
    println!("Top genres:");
    for (genre, count) in report.genre_counts.iter().take(20) {
        println!("  {} ({})", genre, count);
    }
    Ok(report)
}

/// Tag frequencies across the store, most common first
pub fn counts(postkit: &Postkit) -> Result<Vec<(String, usize)>> {
    let store = postkit.store()?;
    let mut tags: HashMap<String, usize> = HashMap::new();
    for article in store.load_all()? {
        if let Ok((fm, _)) = article.front_matter() {
            for tag in fm.tags() {
                *tags.entry(tag).or_insert(0) += 1;
            }
        }
    }
    let mut tags: Vec<_> = tags.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(tags)
}

/// Run `update` on each article's tags; `None` means "no change, skip".
fn for_each_article<F>(postkit: &Postkit, mut update: F) -> Result<TagReport>
where
    F: FnMut(&[String], &str) -> Option<Vec<String>>,
{
    let store = postkit.store()?;
    let mut report = TagReport::default();

    for path in store.list()? {
        match update_one(&path, &mut update) {
            Ok(Some(true)) => report.updated += 1,
            Ok(Some(false)) => report.unchanged += 1,
            Ok(None) => report.skipped += 1,
            Err(e) => {
                report.failed += 1;
                tracing::error!("Failed {:?}: {:#}", path, e);
            }
        }
    }

    Ok(report)
}

fn update_one<F>(path: &Path, update: &mut F) -> Result<Option<bool>>
where
    F: FnMut(&[String], &str) -> Option<Vec<String>>,
{
    let article = Article::load(path)?;
    let (fm, body) = article.front_matter()?;
    let current = fm.tags();

    let Some(new_tags) = update(&current, body) else {
        return Ok(None);
    };
    if new_tags == current {
        return Ok(Some(false));
    }

    article.write(&rewrite_tags(&article.raw, &new_tags)?)?;
    tracing::debug!("Tagged {}: {}", article.file_name, new_tags.join(", "));
    Ok(Some(true))
}

fn print_report(report: &TagReport) {
    println!(
        "Updated: {}, unchanged: {}, skipped: {}, failed: {}",
        report.updated, report.unchanged, report.skipped, report.failed
    );
}

//! Remove articles that share a content id, keeping the newest

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::content::Article;
use crate::Postkit;

/// Articles sharing one content id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub content_id: String,
    pub keep: PathBuf,
    pub remove: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupeReport {
    pub groups: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Group articles by content id and pick a keeper for each duplicate group.
///
/// The keeper has the newest date (front matter, then filename); ties go to
/// the lexicographically last filename. Articles without any content id are
/// ignored.
pub fn find_duplicates(articles: &[Article]) -> Vec<DuplicateGroup> {
    let mut by_id: BTreeMap<String, Vec<(NaiveDate, &Article)>> = BTreeMap::new();
    for article in articles {
        let Some(content_id) = article.content_id() else {
            continue;
        };
        let date = article.date().unwrap_or(NaiveDate::MIN);
        by_id.entry(content_id).or_default().push((date, article));
    }

    by_id
        .into_iter()
        .filter(|(_, entries)| entries.len() > 1)
        .map(|(content_id, mut entries)| {
            entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.file_name.cmp(&a.1.file_name)));
            let keep = entries[0].1.path.clone();
            let remove = entries[1..].iter().map(|(_, a)| a.path.clone()).collect();
            DuplicateGroup {
                content_id,
                keep,
                remove,
            }
        })
        .collect()
}

/// Run the dedupe command
pub fn run(postkit: &Postkit, dry_run: bool) -> Result<DedupeReport> {
    let store = postkit.store()?;
    let articles = store.load_all()?;
    let groups = find_duplicates(&articles);

    let mut report = DedupeReport {
        groups: groups.len(),
        ..Default::default()
    };

    if groups.is_empty() {
        println!("No duplicate content ids");
        return Ok(report);
    }

    for group in &groups {
        println!("{}:", group.content_id);
        println!("  keep   {}", file_name(&group.keep));
        for path in &group.remove {
            if dry_run {
                println!("  delete {} (dry run)", file_name(path));
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => {
                    println!("  delete {}", file_name(path));
                    report.deleted += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to delete {:?}: {}", path, e);
                    report.failed += 1;
                }
            }
        }
    }

    println!(
        "Duplicate ids: {}, deleted: {}, failed: {}",
        report.groups, report.deleted, report.failed
    );
    Ok(report)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

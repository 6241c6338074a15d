//! Report store invariants without modifying anything

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::dedupe::find_duplicates;
use crate::content::article::filename_date;
use crate::content::Article;
use crate::helpers::format_ymd;
use crate::Postkit;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub total: usize,
    /// (file name, front-matter date) where the two disagree
    pub mismatched: Vec<(String, String)>,
    /// (content id, file names)
    pub duplicates: Vec<(String, Vec<String>)>,
    /// Files without a usable front-matter block
    pub unparsable: Vec<String>,
    /// Files whose front matter YAML rejects
    pub needs_repair: Vec<String>,
    /// Articles per date
    pub per_date: BTreeMap<NaiveDate, usize>,
    /// Dates (other than the last) whose count is not the bucket size
    pub uneven: Vec<(NaiveDate, usize)>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty()
            && self.duplicates.is_empty()
            && self.unparsable.is_empty()
            && self.needs_repair.is_empty()
            && self.uneven.is_empty()
    }
}

/// Inspect a set of articles
pub fn inspect(articles: &[Article], per_day: usize) -> CheckReport {
    let mut report = CheckReport {
        total: articles.len(),
        ..Default::default()
    };

    for article in articles {
        if let Some(date) = article.date() {
            *report.per_date.entry(date).or_insert(0) += 1;
        }

        let fm = match article.front_matter() {
            Ok((fm, _)) => fm,
            Err(e) => {
                tracing::debug!("{}: {}", article.file_name, e);
                report.unparsable.push(article.file_name.clone());
                continue;
            }
        };
        if fm.needs_repair() {
            report.needs_repair.push(article.file_name.clone());
        }

        if let Some(prefix) = filename_date(&article.file_name) {
            let field = fm.date().unwrap_or_default();
            if fm.parse_date() != Some(prefix) {
                report.mismatched.push((article.file_name.clone(), field));
            }
        }
    }

    report.duplicates = find_duplicates(articles)
        .into_iter()
        .map(|group| {
            let files = std::iter::once(&group.keep)
                .chain(&group.remove)
                .filter_map(|p| p.file_name())
                .map(|s| s.to_string_lossy().to_string())
                .collect();
            (group.content_id, files)
        })
        .collect();

    let last = report.per_date.keys().next_back().copied();
    report.uneven = report
        .per_date
        .iter()
        .filter(|(date, count)| Some(**date) != last && **count != per_day)
        .map(|(date, count)| (*date, *count))
        .collect();

    report
}

/// Run the check command
pub fn run(postkit: &Postkit, per_day: Option<usize>) -> Result<CheckReport> {
    let store = postkit.store()?;
    let per_day = per_day.unwrap_or(postkit.config.articles_per_day);
    let articles = store.load_all()?;
    let report = inspect(&articles, per_day);

    println!("Articles: {}", report.total);
    for (file, date) in &report.mismatched {
        println!("  date mismatch: {} (front matter: {:?})", file, date);
    }
    for (content_id, files) in &report.duplicates {
        println!("  duplicate {}: {}", content_id, files.join(", "));
    }
    for file in &report.unparsable {
        println!("  no front matter: {}", file);
    }
    for file in &report.needs_repair {
        println!("  needs escape repair: {}", file);
    }
    for (date, count) in &report.uneven {
        println!("  {} has {} articles (expected {})", format_ymd(*date), count, per_day);
    }

    if report.is_clean() {
        println!("No problems found");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn article(name: &str, raw: &str) -> Article {
        Article {
            path: PathBuf::from("/c").join(name),
            file_name: name.to_string(),
            raw: raw.to_string(),
        }
    }

    fn dated(name: &str, date: &str, id: &str) -> Article {
        article(
            name,
            &format!("---\ndate: \"{}\"\ncontentId: \"{}\"\n---\n", date, id),
        )
    }

    #[test]
    fn test_clean_store() {
        let articles = vec![
            dated("2026-01-01-a.md", "2026-01-01", "a"),
            dated("2026-01-01-b.md", "2026-01-01", "b"),
            dated("2026-01-02-c.md", "2026-01-02", "c"),
        ];
        let report = inspect(&articles, 2);
        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(report.per_date.len(), 2);
    }

    #[test]
    fn test_reports_problems() {
        let articles = vec![
            dated("2026-01-01-a.md", "2026-01-05", "a"),
            dated("2026-01-02-b.md", "2026-01-02", "a"),
            article("2026-01-03-c.md", "plain text"),
            article(
                "2026-01-04-d.md",
                "---\ntitle: \"bad \"quote\"\"\ndate: \"2026-01-04\"\n---\n",
            ),
        ];
        let report = inspect(&articles, 1);
        assert_eq!(report.mismatched.len(), 1);
        assert_eq!(report.mismatched[0].0, "2026-01-01-a.md");
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.unparsable, vec!["2026-01-03-c.md".to_string()]);
        assert_eq!(report.needs_repair, vec!["2026-01-04-d.md".to_string()]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_uneven_ignores_last_date() {
        let articles = vec![
            dated("2026-01-01-a.md", "2026-01-01", "a"),
            dated("2026-01-02-b.md", "2026-01-02", "b"),
            dated("2026-01-02-c.md", "2026-01-02", "c"),
            dated("2026-01-03-d.md", "2026-01-03", "d"),
        ];
        let report = inspect(&articles, 2);
        let day1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(report.uneven, vec![(day1, 1)]);
    }
}

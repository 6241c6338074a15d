//! Repair front matter that YAML rejects because of unescaped quotes or
//! backslashes inside values

use anyhow::{bail, Result};
use std::path::Path;

use crate::content::{split, Article};
use crate::Postkit;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscapeReport {
    pub checked: usize,
    pub repaired: usize,
    pub failed: usize,
}

/// Rewrite every article whose front matter only parses line by line
pub fn run(postkit: &Postkit) -> Result<EscapeReport> {
    let store = postkit.store()?;
    let mut report = EscapeReport::default();

    for path in store.list()? {
        report.checked += 1;
        match repair_one(&path) {
            Ok(true) => {
                report.repaired += 1;
                println!("  repaired {}", path.file_name().unwrap_or_default().to_string_lossy());
            }
            Ok(false) => {}
            Err(e) => {
                report.failed += 1;
                tracing::error!("Failed {:?}: {:#}", path, e);
            }
        }

        if report.checked % 100 == 0 {
            tracing::info!(
                "Checked {} articles ({} repaired)",
                report.checked,
                report.repaired
            );
        }
    }

    println!(
        "Checked: {}, repaired: {}, failed: {}",
        report.checked, report.repaired, report.failed
    );
    Ok(report)
}

/// Returns whether the file was rewritten
fn repair_one(path: &Path) -> Result<bool> {
    let article = Article::load(path)?;
    let (fm, body) = article.front_matter()?;
    if !fm.needs_repair() {
        return Ok(false);
    }

    let (yaml, _) = split(&article.raw)?;
    if let Some(line) = unsupported_line(yaml) {
        bail!("front matter has multi-line values ({:?}), repair it by hand", line);
    }

    article.write(&fm.render(body))?;
    Ok(true)
}

/// First line the line parser would drop or truncate: block-list items,
/// indented or colon-less continuation lines, and values that open a quote
/// without closing it on the same line.
fn unsupported_line(yaml: &str) -> Option<&str> {
    yaml.lines().find(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return false;
        }
        if line.starts_with([' ', '\t']) || trimmed.starts_with("- ") {
            return true;
        }
        let Some((_, value)) = line.split_once(':') else {
            return true;
        };
        opens_unclosed_quote(value.trim())
    })
}

fn opens_unclosed_quote(value: &str) -> bool {
    match value.chars().next() {
        Some(q @ ('"' | '\'')) => value.len() < 2 || !value.ends_with(q),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_line() {
        assert_eq!(unsupported_line("title: \"a \"b\" c\"\ndate: \"2026-01-01\""), None);
        assert_eq!(unsupported_line("# note\ntitle: x\n\n"), None);
        assert_eq!(
            unsupported_line("title: x\nexcerpt: \"first line\nsecond line\""),
            Some("excerpt: \"first line")
        );
        assert_eq!(unsupported_line("title: x\ncontinued"), Some("continued"));
        assert_eq!(unsupported_line("tags:\n  - a"), Some("  - a"));
        assert_eq!(unsupported_line("title: 'open"), Some("title: 'open"));
        assert_eq!(unsupported_line("title: \""), Some("title: \""));
    }

    #[test]
    fn test_multi_line_value_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2026-01-01-abc.md");
        let raw = "---\ntitle: \"He said \"hi\"\"\nexcerpt: \"first line\nsecond line\"\n---\nbody\n";
        std::fs::write(&path, raw).unwrap();

        assert!(repair_one(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
    }
}

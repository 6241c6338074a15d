//! Turn Markdown links inside affiliate-link wrappers into HTML anchors

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

use crate::content::Article;
use crate::Postkit;

lazy_static! {
    static ref WRAPPED_LINK: Regex = Regex::new(
        r#"<div className="(affiliate-link|affiliate-link-inline)">\s*\[([^\]]+)\]\(([^)]+)\)\s*</div>"#
    )
    .unwrap();
}

const ANCHOR: &str =
    "<div className=\"${1}\">\n  <a href=\"${3}\" target=\"_blank\" rel=\"noopener noreferrer\">${2}</a>\n</div>";

/// Rewrite every wrapped Markdown link; `None` when nothing matched
pub fn convert_links(content: &str) -> Option<String> {
    if !WRAPPED_LINK.is_match(content) {
        return None;
    }
    Some(WRAPPED_LINK.replace_all(content, ANCHOR).into_owned())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub fixed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Run the fix-links command
pub fn run(postkit: &Postkit) -> Result<LinkReport> {
    let store = postkit.store()?;
    let mut report = LinkReport::default();

    for path in store.list()? {
        let result = Article::load(&path).and_then(|article| match convert_links(&article.raw) {
            Some(fixed) => article.write(&fixed).map(|_| true),
            None => Ok(false),
        });
        match result {
            Ok(true) => {
                report.fixed += 1;
                println!("  fixed {}", path.file_name().unwrap_or_default().to_string_lossy());
            }
            Ok(false) => report.unchanged += 1,
            Err(e) => {
                report.failed += 1;
                tracing::error!("Failed {:?}: {:#}", path, e);
            }
        }
    }

    println!(
        "Fixed: {}, unchanged: {}, failed: {}",
        report.fixed, report.unchanged, report.failed
    );
    Ok(report)
}

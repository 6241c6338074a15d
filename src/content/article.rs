//! Article files and the `{date}-{contentId}.md` naming scheme

use anyhow::{Context, Result};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use super::frontmatter::{FrontMatter, FrontMatterError};
use crate::helpers::{format_ymd, DATE_FORMAT};

lazy_static! {
    /// `YYYY-MM-DD-` at the start of a filename
    static ref DATE_PREFIX: Regex = Regex::new(r"^(\d{4}-\d{2}-\d{2})-").unwrap();
    /// A quoted `date:` line anywhere in the document
    static ref DATE_FIELD: Regex = Regex::new(r#"(?m)^date:\s*"[^"]*""#).unwrap();
}

/// Date encoded in a filename prefix, if any
pub fn filename_date(file_name: &str) -> Option<NaiveDate> {
    let caps = DATE_PREFIX.captures(file_name)?;
    NaiveDate::parse_from_str(&caps[1], DATE_FORMAT).ok()
}

/// Whether a filename starts with a `YYYY-MM-DD-` prefix
pub fn has_date_prefix(file_name: &str) -> bool {
    DATE_PREFIX.is_match(file_name)
}

/// Content id encoded in a dated filename (`2026-01-01-abc001.md` -> `abc001`)
pub fn content_id_from_filename(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    let m = DATE_PREFIX.find(stem)?;
    let id = &stem[m.end()..];
    (!id.is_empty()).then(|| id.to_string())
}

/// Swap the date prefix of a filename; `None` when it has none
pub fn rename_with_date(file_name: &str, date: NaiveDate) -> Option<String> {
    if !has_date_prefix(file_name) {
        return None;
    }
    let replacement = format!("{}-", format_ymd(date));
    Some(DATE_PREFIX.replace(file_name, replacement.as_str()).into_owned())
}

/// Canonical filename for an article
pub fn article_file_name(date: NaiveDate, content_id: &str) -> String {
    format!("{}-{}.md", format_ymd(date), content_id)
}

/// Replace the first quoted `date:` line. Returns the new text and whether a
/// line was replaced; all other bytes are left untouched.
pub fn replace_date_field(content: &str, date: NaiveDate) -> (String, bool) {
    let replacement = format!("date: \"{}\"", format_ymd(date));
    let replaced = DATE_FIELD.is_match(content);
    let updated = DATE_FIELD.replacen(content, 1, regex::NoExpand(&replacement));
    (updated.into_owned(), replaced)
}

/// A Markdown article loaded from the content store
#[derive(Debug, Clone)]
pub struct Article {
    /// Full path on disk
    pub path: PathBuf,
    /// File name (`2026-01-01-abc001.md`)
    pub file_name: String,
    /// Raw file content
    pub raw: String,
}

impl Article {
    /// Load an article from disk
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            raw,
        })
    }

    /// Parse the front matter; returns it with the untouched body
    pub fn front_matter(&self) -> Result<(FrontMatter, &str), FrontMatterError> {
        FrontMatter::parse(&self.raw)
    }

    /// Content id from front matter, falling back to the filename
    pub fn content_id(&self) -> Option<String> {
        self.front_matter()
            .ok()
            .and_then(|(fm, _)| fm.content_id())
            .or_else(|| content_id_from_filename(&self.file_name))
    }

    /// Publication date from front matter, falling back to the filename
    pub fn date(&self) -> Option<NaiveDate> {
        self.front_matter()
            .ok()
            .and_then(|(fm, _)| fm.parse_date())
            .or_else(|| filename_date(&self.file_name))
    }

    /// Overwrite the article in place
    pub fn write(&self, content: &str) -> Result<()> {
        fs::write(&self.path, content).with_context(|| format!("writing {:?}", self.path))
    }
}

//! Turn prompt files into articles through the text-generation API

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::gemini::{self, GeminiClient};
use crate::api::ApiError;
use crate::content::article::{
    article_file_name, content_id_from_filename, filename_date, replace_date_field,
};
use crate::content::split;
use crate::Postkit;

lazy_static! {
    /// Front matter wrapped in a ```yaml fence, body after it
    static ref FENCED_FRONT_MATTER: Regex =
        Regex::new(r"^```(?:yaml|yml)?[ \t]*\n(---\n[\s\S]*?\n---)[ \t]*\n```[ \t]*\n").unwrap();
    /// Whole document wrapped in one ```markdown fence
    static ref FENCED_DOCUMENT: Regex =
        Regex::new(r"^```(?:markdown|md)?[ \t]*\n([\s\S]*?)\n```\s*$").unwrap();
}

const PROMPT_SUFFIX: &str = "-prompt.txt";

#[derive(Debug, Clone, Default)]
pub struct GenerateArgs {
    pub limit: Option<usize>,
    /// Regenerate articles that already exist
    pub force: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    /// (content id, block reason)
    pub blocked: Vec<(String, String)>,
    pub quota_exceeded: bool,
}

/// A `{date}-{contentId}-prompt.txt` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFile {
    pub path: PathBuf,
    pub date: NaiveDate,
    pub content_id: String,
}

/// Date and content id encoded in a prompt filename
pub fn parse_prompt_name(file_name: &str) -> Option<(NaiveDate, String)> {
    let stem = file_name.strip_suffix(PROMPT_SUFFIX)?;
    Some((filename_date(stem)?, content_id_from_filename(stem)?))
}

/// Prompt files in `dir`, sorted by name
pub fn prompt_files(dir: &Path) -> Result<Vec<PromptFile>> {
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        PROMPT_SUFFIX
    );

    let mut files = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("bad pattern {}", pattern))? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Cannot read {:?}: {}", e.path(), e.error());
                continue;
            }
        };
        let parsed = path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(parse_prompt_name);
        match parsed {
            Some((date, content_id)) => files.push(PromptFile {
                path,
                date,
                content_id,
            }),
            None => tracing::warn!("Ignoring {:?}: not {{date}}-{{id}}{}", path, PROMPT_SUFFIX),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Strip code fences the model tends to wrap its output in
pub fn clean_generated(text: &str) -> String {
    let text = text.trim_start();
    let cleaned = if let Some(caps) = FENCED_FRONT_MATTER.captures(text) {
        let rest = &text[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
        let rest = rest.trim_end();
        let rest = rest.strip_suffix("```").unwrap_or(rest);
        format!("{}\n\n{}", &caps[1], rest.trim())
    } else if let Some(caps) = FENCED_DOCUMENT.captures(text) {
        caps[1].trim().to_string()
    } else {
        text.trim_end().to_string()
    };
    format!("{}\n", cleaned)
}

/// Clean the generated text, pin its date to the prompt's and write it
pub fn write_article(target: &Path, text: &str, date: NaiveDate) -> Result<()> {
    let cleaned = clean_generated(text);
    if split(&cleaned).is_err() {
        bail!("generated text has no front matter");
    }
    let (content, _) = replace_date_field(&cleaned, date);
    fs::write(target, content).with_context(|| format!("writing {:?}", target))
}

/// Run the generate command
pub async fn run(postkit: &Postkit, args: GenerateArgs) -> Result<GenerateReport> {
    let api_key = gemini::api_key_from_env()?;
    let client = GeminiClient::new(postkit.config.generation.clone(), api_key)?;
    let delay = Duration::from_secs(postkit.config.generation.request_delay_secs);

    let files = prompt_files(&postkit.prompts_dir)?;
    tracing::info!("Found {} prompt files in {:?}", files.len(), postkit.prompts_dir);
    fs::create_dir_all(&postkit.content_dir)
        .with_context(|| format!("creating {:?}", postkit.content_dir))?;

    let mut report = GenerateReport::default();
    let limit = args.limit.unwrap_or(usize::MAX);
    let mut requested = false;

    for file in &files {
        if report.written + report.failed >= limit {
            break;
        }
        let target = postkit
            .content_dir
            .join(article_file_name(file.date, &file.content_id));
        if target.exists() && !args.force {
            report.skipped += 1;
            continue;
        }

        let prompt = match fs::read_to_string(&file.path) {
            Ok(prompt) => prompt,
            Err(e) => {
                report.failed += 1;
                tracing::error!("Failed to read {:?}: {}", file.path, e);
                continue;
            }
        };

        if requested {
            tokio::time::sleep(delay).await;
        }
        requested = true;

        tracing::info!("Generating {}", file.content_id);
        match client.generate(&prompt).await {
            Ok(text) => match write_article(&target, &text, file.date) {
                Ok(()) => {
                    report.written += 1;
                    println!("  wrote {}", target.file_name().unwrap_or_default().to_string_lossy());
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("{}: {:#}", file.content_id, e);
                }
            },
            Err(ApiError::QuotaExceeded(message)) => {
                report.quota_exceeded = true;
                tracing::error!("Quota exceeded, stopping: {}", message);
                break;
            }
            Err(ApiError::Blocked(reason)) => {
                report.failed += 1;
                tracing::warn!("{} blocked: {}", file.content_id, reason);
                report.blocked.push((file.content_id.clone(), reason));
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!("{}: {}", file.content_id, e);
            }
        }
    }

    println!(
        "Written: {}, skipped: {}, failed: {} ({} blocked)",
        report.written,
        report.skipped,
        report.failed,
        report.blocked.len()
    );
    if report.quota_exceeded {
        bail!("quota exceeded after {} articles", report.written);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_prompt_name() {
        assert_eq!(
            parse_prompt_name("2026-01-02-abc00001-prompt.txt"),
            Some((ymd(2026, 1, 2), "abc00001".to_string()))
        );
        assert_eq!(parse_prompt_name("2026-01-02-abc00001.txt"), None);
        assert_eq!(parse_prompt_name("notes-prompt.txt"), None);
    }

    #[test]
    fn test_prompt_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "2026-01-02-bbb-prompt.txt",
            "2026-01-01-aaa-prompt.txt",
            "stray-prompt.txt",
            "2026-01-01-ccc.md",
        ] {
            fs::write(dir.path().join(name), "p").unwrap();
        }
        let files = prompt_files(dir.path()).unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.content_id.as_str()).collect();
        assert_eq!(ids, vec!["aaa", "bbb"]);
        assert_eq!(files[1].date, ymd(2026, 1, 2));
    }

    #[test]
    fn test_clean_generated() {
        let plain = "---\ntitle: \"a\"\n---\n\nbody";
        assert_eq!(clean_generated(plain), "---\ntitle: \"a\"\n---\n\nbody\n");

        let fenced_front = "```yaml\n---\ntitle: \"a\"\n---\n```\nbody text\n```";
        assert_eq!(
            clean_generated(fenced_front),
            "---\ntitle: \"a\"\n---\n\nbody text\n"
        );

        let fenced_doc = "```markdown\n---\ntitle: \"a\"\n---\n\nbody\n```\n";
        assert_eq!(clean_generated(fenced_doc), "---\ntitle: \"a\"\n---\n\nbody\n");
    }

    #[test]
    fn test_write_article_pins_date() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("2026-01-02-abc.md");
        write_article(
            &target,
            "```markdown\n---\ntitle: \"a\"\ndate: \"2024-05-05\"\n---\n\nbody\n```",
            ymd(2026, 1, 2),
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "---\ntitle: \"a\"\ndate: \"2026-01-02\"\n---\n\nbody\n"
        );

        let missing = dir.path().join("2026-01-02-def.md");
        assert!(write_article(&missing, "Just prose, no front matter.", ymd(2026, 1, 2)).is_err());
        assert!(!missing.exists());
    }
}

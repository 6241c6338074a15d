//! Write article prompts from cached product data

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_yaml::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::{latest_path, CacheFile, ProductRecord};
use crate::content::FrontMatter;
use crate::helpers::format_ymd;
use crate::Postkit;

#[derive(Debug, Clone)]
pub struct PromptArgs {
    /// Cache file; defaults to `{data_dir}/{default_data_name}_latest.json`
    pub data: Option<PathBuf>,
    pub date: NaiveDate,
    pub limit: Option<usize>,
    pub skip_existing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptReport {
    pub written: usize,
    pub skipped: usize,
}

/// Front matter the generated article has to start with
pub fn front_matter_for(record: &ProductRecord, date: NaiveDate, rating: f64, tag_limit: usize) -> FrontMatter {
    let mut fm = FrontMatter::default();
    fm.set_str("title", &record.title);
    fm.set_str("date", &format_ymd(date));
    fm.set_str("excerpt", "");
    fm.set_str("image", &record.image_url);
    let tags: Vec<String> = record.genre.iter().take(tag_limit).cloned().collect();
    fm.set_tags(&tags);
    fm.set_str("affiliateLink", &record.affiliate_url);
    fm.set_str("contentId", &record.content_id);
    fm.set("rating", Value::Number(rating.into()));
    fm
}

/// Render the prompt text for one product
pub fn render_prompt(record: &ProductRecord, front_matter: &FrontMatter) -> String {
    let or_unknown = |items: &[String]| {
        if items.is_empty() {
            "unknown".to_string()
        } else {
            items.join("、")
        }
    };
    let maker = if record.maker.is_empty() { "unknown" } else { record.maker.as_str() };

    format!(
        r#"Write a review article in Markdown for the product below.

## Product
- Title: {title}
- Content ID: {content_id}
- Genres: {genres}
- Performers: {performers}
- Maker: {maker}
- Release date: {release}
- Image: {image}
- Affiliate link: {link}

## Requirements
- Start the file with exactly this front matter, filling in `excerpt`:

{front_matter}
- Include a line `**ジャンル:** {genres}` near the top of the body.
- End with the affiliate link wrapped in <div className="affiliate-link"></div>.
"#,
        title = record.title,
        content_id = record.content_id,
        genres = or_unknown(&record.genre),
        performers = or_unknown(&record.actress),
        maker = maker,
        release = record.release_date,
        image = record.image_url,
        link = record.affiliate_url,
        front_matter = front_matter.to_block(),
    )
}

/// `{prompts_dir}/{date}-{contentId}-prompt.txt`
pub fn prompt_path(dir: &Path, date: NaiveDate, content_id: &str) -> PathBuf {
    dir.join(format!("{}-{}-prompt.txt", format_ymd(date), content_id))
}

/// Run the prompts command
pub fn run(postkit: &Postkit, args: PromptArgs) -> Result<PromptReport> {
    let data = args
        .data
        .clone()
        .unwrap_or_else(|| latest_path(&postkit.data_dir, &postkit.config.default_data_name));
    let cache = CacheFile::load(&data)?;
    tracing::info!("Loaded {} records from {:?}", cache.ranking.len(), data);

    let existing: HashSet<String> = if args.skip_existing {
        match postkit.store() {
            Ok(store) => store.existing_content_ids()?,
            Err(_) => HashSet::new(),
        }
    } else {
        HashSet::new()
    };

    fs::create_dir_all(&postkit.prompts_dir)
        .with_context(|| format!("creating {:?}", postkit.prompts_dir))?;

    let mut report = PromptReport::default();
    let limit = args.limit.unwrap_or(usize::MAX);

    for record in &cache.ranking {
        if report.written >= limit {
            break;
        }
        if record.content_id.is_empty() {
            tracing::warn!("Record without content id: {}", record.title);
            report.skipped += 1;
            continue;
        }

        let path = prompt_path(&postkit.prompts_dir, args.date, &record.content_id);
        if args.skip_existing && (existing.contains(&record.content_id) || path.exists()) {
            report.skipped += 1;
            continue;
        }

        let fm = front_matter_for(
            record,
            args.date,
            postkit.config.default_rating,
            postkit.config.tag_limit,
        );
        fs::write(&path, render_prompt(record, &fm))
            .with_context(|| format!("writing {:?}", path))?;
        report.written += 1;
    }

    println!("Prompts written: {}, skipped: {}", report.written, report.skipped);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProductRecord {
        ProductRecord {
            rank: 1,
            content_id: "abc00001".to_string(),
            title: "A \"quoted\" title".to_string(),
            affiliate_url: "https://example.com/?af=1".to_string(),
            image_url: "https://example.com/pl.jpg".to_string(),
            genre: vec!["ドラマ".to_string(), "人妻".to_string(), "単体作品".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_front_matter_parses_back() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let fm = front_matter_for(&record(), date, 4.0, 2);
        let (parsed, _) = FrontMatter::parse(&fm.to_block()).unwrap();
        assert!(!parsed.needs_repair());
        assert_eq!(parsed.title().as_deref(), Some("A \"quoted\" title"));
        assert_eq!(parsed.date().as_deref(), Some("2026-01-02"));
        assert_eq!(parsed.tags(), vec!["ドラマ", "人妻"]);
        assert_eq!(parsed.content_id().as_deref(), Some("abc00001"));
    }

    #[test]
    fn test_render_prompt() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let rec = record();
        let fm = front_matter_for(&rec, date, 4.0, 15);
        let prompt = render_prompt(&rec, &fm);
        assert!(prompt.contains("- Content ID: abc00001"));
        assert!(prompt.contains("- Performers: unknown"));
        assert!(prompt.contains("**ジャンル:** ドラマ、人妻、単体作品"));
        assert!(prompt.contains("contentId: \"abc00001\""));
    }

    #[test]
    fn test_prompt_path() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(
            prompt_path(Path::new("/p"), date, "abc"),
            PathBuf::from("/p/2026-01-02-abc-prompt.txt")
        );
    }
}

//! List store content

use anyhow::Result;
use std::collections::BTreeMap;

use crate::helpers::format_ymd;
use crate::Postkit;

/// What to group articles by
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListBy {
    Date,
    Tag,
}

/// List article counts by date or by tag
pub fn run(postkit: &Postkit, by: ListBy) -> Result<()> {
    match by {
        ListBy::Date => {
            let store = postkit.store()?;
            let articles = store.load_all()?;
            let mut dates: BTreeMap<String, usize> = BTreeMap::new();
            for article in &articles {
                let key = article
                    .date()
                    .map(format_ymd)
                    .unwrap_or_else(|| "undated".to_string());
                *dates.entry(key).or_insert(0) += 1;
            }
            println!("Articles ({}):", articles.len());
            for (date, count) in dates {
                println!("  {} ({})", date, count);
            }
        }
        ListBy::Tag => {
            let tags = super::tags::counts(postkit)?;
            println!("Tags ({}):", tags.len());
            for (tag, count) in tags {
                println!("  {} ({})", tag, count);
            }
        }
    }

    Ok(())
}

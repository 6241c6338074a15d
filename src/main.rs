//! CLI entry point for postkit

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postkit::api::Sort;
use postkit::commands;
use postkit::commands::list::ListBy;
use postkit::config::OnConflict;
use postkit::helpers::{parse_date_arg, today};
use postkit::reassign::parse_segments;
use postkit::Postkit;

#[derive(Parser)]
#[command(name = "postkit")]
#[command(version)]
#[command(about = "Batch maintenance for Markdown article stores", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reassign article dates in day-sized buckets (filename order)
    Reassign {
        /// Date of the first bucket (YYYY-MM-DD, today, yesterday)
        #[arg(short, long)]
        start: String,

        /// Articles per day (defaults to the config value)
        #[arg(short = 'n', long)]
        per_day: Option<usize>,

        /// Fixed leading segments, e.g. 2025-12-30:150,2025-12-31:150
        #[arg(long)]
        schedule: Option<String>,

        /// What to do when the renamed file already exists
        #[arg(long, value_enum)]
        on_conflict: Option<OnConflict>,

        /// Only reassign the first N articles
        #[arg(long)]
        limit: Option<usize>,

        /// Add a date prefix to filenames that have none
        #[arg(long)]
        prefix_undated: bool,

        /// Print the plan without touching files
        #[arg(long)]
        dry_run: bool,
    },

    /// Move future-dated articles to today
    ClampFuture {
        /// Override today's date
        #[arg(long)]
        today: Option<String>,
    },

    /// Rewrite front matter that YAML rejects (unescaped quotes, backslashes)
    RepairEscapes,

    /// Tag maintenance
    Tags {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Delete articles sharing a content id, keeping the newest
    Dedupe {
        /// Only show what would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Turn wrapped Markdown affiliate links into HTML anchors
    FixLinks,

    /// Report date mismatches, duplicates and uneven buckets
    Check {
        /// Expected articles per day (defaults to the config value)
        #[arg(short = 'n', long)]
        per_day: Option<usize>,
    },

    /// List article counts
    List {
        /// Group by date or tag
        #[arg(value_enum, default_value = "date")]
        by: ListBy,
    },

    /// Fetch product data from the affiliate API into the data directory
    Fetch {
        /// Search keyword
        #[arg(short, long)]
        keyword: Option<String>,

        /// Look up a single content id
        #[arg(long)]
        cid: Option<String>,

        /// Sort order
        #[arg(long, value_enum, default_value = "rank")]
        sort: Sort,

        /// Items per page
        #[arg(long, default_value = "20")]
        hits: u32,

        /// 1-based offset of the first item
        #[arg(long, default_value = "1")]
        offset: u32,

        /// Number of pages to fetch
        #[arg(long, default_value = "1")]
        pages: u32,

        /// Keep only items whose title or genres contain one of these words
        #[arg(long)]
        filter: Vec<String>,

        /// Drop items that already have an article
        #[arg(long)]
        exclude_existing: bool,

        /// Cache file name prefix (defaults to the config value)
        #[arg(long)]
        name: Option<String>,
    },

    /// Write article prompts from cached product data
    Prompts {
        /// Cache file to read
        #[arg(long)]
        data: Option<PathBuf>,

        /// Date used in prompt filenames and front matter
        #[arg(long, default_value = "today")]
        date: String,

        /// Maximum number of prompts to write
        #[arg(long)]
        limit: Option<usize>,

        /// Skip products that already have an article or prompt
        #[arg(long)]
        skip_existing: bool,
    },

    /// Generate articles from prompt files through the text-generation API
    Generate {
        /// Stop after N articles (written or failed)
        #[arg(long)]
        limit: Option<usize>,

        /// Regenerate articles that already exist
        #[arg(long)]
        force: bool,
    },

    /// Scrape MGS search results into the data directory
    ScrapeMgs {
        /// Search keyword, repeatable (defaults to the config list)
        #[arg(short, long)]
        keyword: Vec<String>,

        /// Result pages per keyword (defaults to the config value)
        #[arg(long)]
        pages: Option<u32>,

        /// Fetch each product page for cast, genres and maker
        #[arg(long)]
        details: bool,

        /// Drop products that already have an article
        #[arg(long)]
        exclude_existing: bool,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
enum TagAction {
    /// Append tags to every article
    Add { tags: Vec<String> },
    /// Remove tags from every article
    Remove { tags: Vec<String> },
    /// Merge the genres line of each body into its tags
    FromGenres,
    /// Tag frequencies
    List,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "postkit=debug,info"
    } else {
        "postkit=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    if let Err(e) = dotenvy::from_path(base_dir.join(".env")) {
        tracing::debug!("No .env loaded: {}", e);
    }

    let postkit = Postkit::new(&base_dir)?;

    match cli.command {
        Commands::Reassign {
            start,
            per_day,
            schedule,
            on_conflict,
            limit,
            prefix_undated,
            dry_run,
        } => {
            let segments = match schedule {
                Some(s) => parse_segments(&s)?,
                None => Vec::new(),
            };
            let args = commands::reassign::ReassignArgs {
                start: parse_date_arg(&start)?,
                per_day,
                segments,
                on_conflict,
                limit,
                prefix_undated,
                dry_run,
            };
            let report = commands::reassign::run(&postkit, args)?;
            if report.failed > 0 {
                anyhow::bail!("{} articles failed", report.failed);
            }
        }

        Commands::ClampFuture { today: day } => {
            let day = match day {
                Some(s) => parse_date_arg(&s)?,
                None => today(),
            };
            commands::clamp::run(&postkit, day)?;
        }

        Commands::RepairEscapes => {
            commands::escapes::run(&postkit)?;
        }

        Commands::Tags { action } => match action {
            TagAction::Add { tags } => {
                commands::tags::add(&postkit, &tags)?;
            }
            TagAction::Remove { tags } => {
                commands::tags::remove(&postkit, &tags)?;
            }
            TagAction::FromGenres => {
                commands::tags::from_genres(&postkit)?;
            }
            TagAction::List => {
                commands::list::run(&postkit, ListBy::Tag)?;
            }
        },

        Commands::Dedupe { dry_run } => {
            commands::dedupe::run(&postkit, dry_run)?;
        }

        Commands::FixLinks => {
            commands::links::run(&postkit)?;
        }

        Commands::Check { per_day } => {
            let report = commands::check::run(&postkit, per_day)?;
            if !report.is_clean() {
                std::process::exit(1);
            }
        }

        Commands::List { by } => {
            commands::list::run(&postkit, by)?;
        }

        Commands::Fetch {
            keyword,
            cid,
            sort,
            hits,
            offset,
            pages,
            filter,
            exclude_existing,
            name,
        } => {
            if keyword.is_none() && cid.is_none() {
                anyhow::bail!("fetch needs --keyword or --cid");
            }
            let args = commands::fetch::FetchArgs {
                keyword,
                content_id: cid,
                sort,
                hits,
                offset,
                pages,
                filter,
                exclude_existing,
                name,
            };
            commands::fetch::run(&postkit, args).await?;
        }

        Commands::Prompts {
            data,
            date,
            limit,
            skip_existing,
        } => {
            let args = commands::prompts::PromptArgs {
                data,
                date: parse_date_arg(&date)?,
                limit,
                skip_existing,
            };
            commands::prompts::run(&postkit, args)?;
        }

        Commands::Generate { limit, force } => {
            let args = commands::generate::GenerateArgs { limit, force };
            let report = commands::generate::run(&postkit, args).await?;
            if report.failed > 0 {
                anyhow::bail!("{} articles failed", report.failed);
            }
        }

        Commands::ScrapeMgs {
            keyword,
            pages,
            details,
            exclude_existing,
        } => {
            let args = commands::scrape_mgs::ScrapeArgs {
                keywords: keyword,
                pages,
                details,
                exclude_existing,
            };
            commands::scrape_mgs::run(&postkit, args).await?;
        }

        Commands::Version => {
            println!("postkit version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

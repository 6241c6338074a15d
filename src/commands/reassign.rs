//! Reassign article dates in day-sized buckets

use anyhow::Result;
use chrono::NaiveDate;

use crate::config::OnConflict;
use crate::helpers::format_ymd;
use crate::reassign::{self, ReassignOptions, ReassignReport, Schedule, Segment};
use crate::Postkit;

/// Command-line arguments, already parsed
#[derive(Debug, Clone)]
pub struct ReassignArgs {
    pub start: NaiveDate,
    pub per_day: Option<usize>,
    pub segments: Vec<Segment>,
    pub on_conflict: Option<OnConflict>,
    pub limit: Option<usize>,
    pub prefix_undated: bool,
    pub dry_run: bool,
}

/// Run the reassign command
pub fn run(postkit: &Postkit, args: ReassignArgs) -> Result<ReassignReport> {
    let store = postkit.store()?;
    let per_day = args.per_day.unwrap_or(postkit.config.articles_per_day);
    let schedule = Schedule::new(args.start, per_day)?.with_segments(args.segments);

    let options = ReassignOptions {
        schedule,
        on_conflict: args.on_conflict.unwrap_or(postkit.config.on_conflict),
        limit: args.limit,
        prefix_undated: args.prefix_undated,
        dry_run: args.dry_run,
    };

    let report = reassign::run(&store, &options)?;

    let verb = if args.dry_run { "Would update" } else { "Updated" };
    println!("{}: {}", verb, report.updated);
    if report.skipped > 0 {
        println!("Skipped (target exists): {}", report.skipped);
    }
    if report.failed > 0 {
        println!("Failed: {}", report.failed);
    }
    if report.missing_date_field > 0 {
        println!("Without a quoted date field: {}", report.missing_date_field);
    }
    if let (Some(first), Some(last)) = (report.first_date, report.last_date) {
        println!("Dates: {} .. {}", format_ymd(first), format_ymd(last));
    }

    Ok(report)
}

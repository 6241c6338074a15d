//! Batch date reassignment
//!
//! Walks the content store in filename order, gives each article the date
//! its position maps to under a [`Schedule`], rewrites the quoted `date:`
//! line and renames `YYYY-MM-DD-*` files to the new prefix.
//!
//! The routine has no memory of earlier runs: every run re-buckets the store
//! from its current filename order.

mod schedule;

pub use schedule::{parse_segments, Schedule, ScheduleError, Segment};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::config::OnConflict;
use crate::content::article::{has_date_prefix, rename_with_date, replace_date_field};
use crate::content::{ContentStore, StoreError};
use crate::helpers::format_ymd;

/// Options for one reassignment run
#[derive(Debug, Clone)]
pub struct ReassignOptions {
    pub schedule: Schedule,
    pub on_conflict: OnConflict,
    /// Only the first N files in filename order are touched
    pub limit: Option<usize>,
    /// Give undated filenames a date prefix instead of rewriting them in place
    pub prefix_undated: bool,
    pub dry_run: bool,
}

impl ReassignOptions {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            on_conflict: OnConflict::Skip,
            limit: None,
            prefix_undated: false,
            dry_run: false,
        }
    }
}

/// Where one article goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub source: PathBuf,
    pub target: PathBuf,
    pub date: NaiveDate,
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassignReport {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Articles with no quoted `date:` line (renamed, content unchanged)
    pub missing_date_field: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl ReassignReport {
    pub fn total(&self) -> usize {
        self.updated + self.skipped + self.failed
    }
}

enum Outcome {
    Updated { date_field: bool },
    Skipped,
}

/// Compute the target of every file without touching the disk
pub fn plan(files: &[PathBuf], options: &ReassignOptions) -> Vec<Assignment> {
    let limit = options.limit.unwrap_or(files.len());

    files
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, source)| {
            let date = options.schedule.date_for(index);
            // Non-UTF-8 names stay put and fail in `apply`
            let Some(file_name) = source.file_name().and_then(|s| s.to_str()) else {
                return Assignment {
                    source: source.clone(),
                    target: source.clone(),
                    date,
                };
            };

            let target_name = match rename_with_date(file_name, date) {
                Some(renamed) => renamed,
                None if options.prefix_undated && !has_date_prefix(file_name) => {
                    format!("{}-{}", format_ymd(date), file_name)
                }
                None => file_name.to_string(),
            };

            Assignment {
                source: source.clone(),
                target: source.with_file_name(target_name),
                date,
            }
        })
        .collect()
}

/// Reassign dates across the whole store
pub fn run(store: &ContentStore, options: &ReassignOptions) -> Result<ReassignReport, StoreError> {
    let files = store.list()?;
    let assignments = plan(&files, options);
    tracing::info!(
        "Reassigning {} of {} articles from {} ({} per day)",
        assignments.len(),
        files.len(),
        format_ymd(options.schedule.start()),
        options.schedule.per_day()
    );

    let mut report = ReassignReport {
        first_date: assignments.first().map(|a| a.date),
        last_date: assignments.last().map(|a| a.date),
        ..Default::default()
    };

    for (index, assignment) in assignments.iter().enumerate() {
        if options.dry_run {
            println!(
                "  {} -> {}",
                display_name(&assignment.source),
                display_name(&assignment.target)
            );
            report.updated += 1;
            continue;
        }

        match apply(assignment, options.on_conflict) {
            Ok(Outcome::Updated { date_field }) => {
                report.updated += 1;
                if !date_field {
                    report.missing_date_field += 1;
                    tracing::warn!(
                        "No quoted date field in {}, renamed only",
                        display_name(&assignment.source)
                    );
                }
            }
            Ok(Outcome::Skipped) => {
                report.skipped += 1;
                tracing::warn!(
                    "Skipped {} -> {} (target exists)",
                    display_name(&assignment.source),
                    display_name(&assignment.target)
                );
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!("Failed {}: {:#}", display_name(&assignment.source), e);
            }
        }

        if (index + 1) % 100 == 0 {
            tracing::info!(
                "Processed {} articles (current date: {})",
                index + 1,
                format_ymd(assignment.date)
            );
        }
    }

    Ok(report)
}

/// Rewrite one article and move it to its target name
fn apply(assignment: &Assignment, on_conflict: OnConflict) -> Result<Outcome> {
    if assignment.source.file_name().and_then(|s| s.to_str()).is_none() {
        bail!("file name is not valid UTF-8");
    }
    let content = fs::read_to_string(&assignment.source)
        .with_context(|| format!("reading {:?}", assignment.source))?;
    let (updated, date_field) = replace_date_field(&content, assignment.date);

    if assignment.target != assignment.source {
        if assignment.target.exists() && on_conflict == OnConflict::Skip {
            return Ok(Outcome::Skipped);
        }
        fs::write(&assignment.target, updated)
            .with_context(|| format!("writing {:?}", assignment.target))?;
        fs::remove_file(&assignment.source)
            .with_context(|| format!("removing {:?}", assignment.source))?;
    } else {
        fs::write(&assignment.source, updated)
            .with_context(|| format!("writing {:?}", assignment.source))?;
    }

    Ok(Outcome::Updated { date_field })
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plan_renames_dated_and_keeps_undated() {
        let files = vec![
            PathBuf::from("/c/2025-05-05-abc.md"),
            PathBuf::from("/c/2025-05-05-def.md"),
            PathBuf::from("/c/loose.md"),
        ];
        let options = ReassignOptions::new(Schedule::new(ymd(2026, 1, 1), 2).unwrap());
        let plan = plan(&files, &options);
        assert_eq!(plan[0].target, PathBuf::from("/c/2026-01-01-abc.md"));
        assert_eq!(plan[1].target, PathBuf::from("/c/2026-01-01-def.md"));
        assert_eq!(plan[2].target, PathBuf::from("/c/loose.md"));
        assert_eq!(plan[2].date, ymd(2026, 1, 2));
    }

    #[test]
    fn test_plan_prefix_undated_and_limit() {
        let files = vec![PathBuf::from("/c/a.md"), PathBuf::from("/c/b.md")];
        let mut options = ReassignOptions::new(Schedule::new(ymd(2026, 1, 1), 5).unwrap());
        options.prefix_undated = true;
        options.limit = Some(1);
        let plan = plan(&files, &options);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].target, PathBuf::from("/c/2026-01-01-a.md"));
    }

    #[cfg(unix)]
    #[test]
    fn test_plan_keeps_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let odd = PathBuf::from("/c").join(OsStr::from_bytes(b"2025-01-01-\xff.md"));
        let files = vec![odd.clone()];
        let mut options = ReassignOptions::new(Schedule::new(ymd(2026, 1, 1), 5).unwrap());
        options.prefix_undated = true;
        let plan = plan(&files, &options);
        assert_eq!(plan[0].target, odd);
    }
}

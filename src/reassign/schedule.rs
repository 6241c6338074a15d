//! Date schedules: which calendar date the i-th sorted article gets

use chrono::{Days, NaiveDate};
use std::str::FromStr;
use thiserror::Error;

use crate::helpers::DATE_FORMAT;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("articles per day must be greater than zero")]
    InvalidBucketSize,
    #[error("invalid schedule segment '{0}' (expected YYYY-MM-DD:COUNT)")]
    InvalidSegment(String),
}

/// A fixed run of `count` articles placed on `date`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub date: NaiveDate,
    pub count: usize,
}

impl FromStr for Segment {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidSegment(s.to_string());
        let (date, count) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| invalid())?;
        let count = count.trim().parse().map_err(|_| invalid())?;
        Ok(Self { date, count })
    }
}

/// Parse `DATE:COUNT[,DATE:COUNT...]`
pub fn parse_segments(s: &str) -> Result<Vec<Segment>, ScheduleError> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Leading fixed segments followed by `per_day`-sized daily buckets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    segments: Vec<Segment>,
    start: NaiveDate,
    per_day: usize,
}

impl Schedule {
    pub fn new(start: NaiveDate, per_day: usize) -> Result<Self, ScheduleError> {
        if per_day == 0 {
            return Err(ScheduleError::InvalidBucketSize);
        }
        Ok(Self {
            segments: Vec::new(),
            start,
            per_day,
        })
    }

    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn per_day(&self) -> usize {
        self.per_day
    }

    /// Date for the article at `index` in filename order.
    ///
    /// After the fixed segments, this is `start + floor(i / per_day)` days.
    pub fn date_for(&self, index: usize) -> NaiveDate {
        let mut index = index;
        for segment in &self.segments {
            if index < segment.count {
                return segment.date;
            }
            index -= segment.count;
        }
        let offset = (index / self.per_day) as u64;
        self.start
            .checked_add_days(Days::new(offset))
            .unwrap_or(NaiveDate::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_zero_bucket_rejected() {
        assert_eq!(
            Schedule::new(ymd(2026, 1, 1), 0),
            Err(ScheduleError::InvalidBucketSize)
        );
    }

    #[test]
    fn test_daily_buckets() {
        let schedule = Schedule::new(ymd(2026, 1, 1), 10).unwrap();
        assert_eq!(schedule.date_for(0), ymd(2026, 1, 1));
        assert_eq!(schedule.date_for(9), ymd(2026, 1, 1));
        assert_eq!(schedule.date_for(10), ymd(2026, 1, 2));
        assert_eq!(schedule.date_for(24), ymd(2026, 1, 3));
    }

    #[test]
    fn test_buckets_cross_month_end() {
        let schedule = Schedule::new(ymd(2025, 12, 31), 1).unwrap();
        assert_eq!(schedule.date_for(1), ymd(2026, 1, 1));
    }

    #[test]
    fn test_segments_then_buckets() {
        let segments = parse_segments("2025-12-30:150, 2025-12-31:150").unwrap();
        let schedule = Schedule::new(ymd(2026, 1, 2), 20)
            .unwrap()
            .with_segments(segments);
        assert_eq!(schedule.date_for(0), ymd(2025, 12, 30));
        assert_eq!(schedule.date_for(149), ymd(2025, 12, 30));
        assert_eq!(schedule.date_for(150), ymd(2025, 12, 31));
        assert_eq!(schedule.date_for(300), ymd(2026, 1, 2));
        assert_eq!(schedule.date_for(320), ymd(2026, 1, 3));
    }

    #[test]
    fn test_invalid_segments() {
        assert!(parse_segments("2025-12-30").is_err());
        assert!(parse_segments("2025-12-30:many").is_err());
        assert!(parse_segments("30/12/2025:5").is_err());
        assert_eq!(parse_segments("").unwrap(), Vec::new());
    }
}

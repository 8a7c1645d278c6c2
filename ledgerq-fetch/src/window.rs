//! Inclusive calendar-date windows and chunking.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("invalid {which} date `{value}` (expected YYYY-MM-DD)")]
    InvalidDate { which: &'static str, value: String },
}

/// Inclusive `[start, end]` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        Ok(Self {
            start: parse_date("start", start)?,
            end: parse_date("end", end)?,
        })
    }

    /// A window whose start is after its end covers no days.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

fn parse_date(which: &'static str, value: &str) -> Result<NaiveDate, WindowError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| WindowError::InvalidDate {
        which,
        value: value.to_string(),
    })
}

/// Split `window` into contiguous, non-overlapping chunks of at most
/// `chunk_days` days each, in chronological order.
pub fn split_window(window: &DateWindow, chunk_days: u32) -> Vec<DateWindow> {
    let span = u64::from(chunk_days.max(1));
    let mut out = Vec::new();
    let mut start = window.start;

    while start <= window.end {
        let end = start
            .checked_add_days(Days::new(span - 1))
            .map_or(window.end, |d| d.min(window.end));
        out.push(DateWindow { start, end });

        match end.succ_opt() {
            Some(next) => start = next,
            None => break,
        }
    }

    out
}

//! Inclusive calendar date ranges and the API-sized chunks they are planned into.

use chrono::{Days, NaiveDate};
use std::fmt;

/// An inclusive range of calendar dates. `start <= end` always holds.
///
/// # Examples
///
/// ```
/// use fire_timelapse::DateRange;
/// use chrono::NaiveDate;
///
/// let august = DateRange::new(
///     NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2023, 8, 31).unwrap(),
/// ).unwrap();
/// assert_eq!(august.span_days(), 31);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn span_days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Splits the range into consecutive pieces of at most `max_days` days.
    /// The last piece is clamped to `end`.
    pub(crate) fn split(&self, max_days: u32) -> Vec<DateRange> {
        let step = max_days.max(1) as u64;
        let mut pieces = Vec::new();
        let mut current = self.start;
        loop {
            let piece_end = current
                .checked_add_days(Days::new(step - 1))
                .map_or(self.end, |d| d.min(self.end));
            pieces.push(DateRange {
                start: current,
                end: piece_end,
            });
            match piece_end.succ_opt() {
                Some(next) if piece_end < self.end => current = next,
                _ => break,
            }
        }
        pieces
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One request-sized date window: a range no longer than the provider's
/// per-request limit, together with its span in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    pub range: DateRange,
    pub span_days: u32,
}

impl Chunk {
    pub(crate) fn new(range: DateRange) -> Self {
        Self {
            range,
            span_days: range.span_days(),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.range.start()
    }

    pub fn end(&self) -> NaiveDate {
        self.range.end()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.range.start(), self.range.end())
    }
}

//! Dense daily axis
//!
//! Every view in a response is laid over the same run of consecutive calendar
//! days ending on today.

use chrono::{Duration, NaiveDate};

/// Days on the axis
pub const AXIS_DAYS: usize = 90;

/// Days the divergence sum covers, counted back from the end of the axis
pub const DIFF_WINDOW: usize = 30;

/// Consecutive days, ascending, ending on a given day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateAxis {
    days: Vec<NaiveDate>,
}

impl DateAxis {
    /// The standard axis: `today - 89 ..= today`
    pub fn ending(today: NaiveDate) -> Self {
        Self::with_len(today, AXIS_DAYS)
    }

    pub fn with_len(today: NaiveDate, len: usize) -> Self {
        let days = (0..len)
            .rev()
            .map(|back| today - Duration::days(back as i64))
            .collect();
        Self { days }
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    /// Whether `date` lies on the axis
    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => first <= date && date <= last,
            _ => false,
        }
    }

    /// Index of the first of the trailing `n` entries
    pub fn tail_start(&self, n: usize) -> usize {
        self.days.len().saturating_sub(n)
    }
}

/// The trailing `n` items of `items` (all of them if there are fewer)
pub fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

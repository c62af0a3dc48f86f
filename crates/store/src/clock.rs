//! Time source
//!
//! Every "now" and "today" in the service comes from a [`Clock`]. Calendar days
//! are UTC days.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::RwLock;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar day
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    /// Clock frozen at midday of `date`
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        Self::new(noon.and_utc())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
        let clock = FixedClock::at_date(date);
        assert_eq!(clock.today(), date);
    }

    #[test]
    fn test_fixed_clock_advance_shared_between_clones() {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2025, 1, 30).unwrap());
        let other = clock.clone();
        clock.advance(Duration::days(2));
        assert_eq!(other.today(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }
}

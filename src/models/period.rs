use std::fmt::{self, Display};

use chrono::{Datelike, Duration, NaiveDate};

/// One (year, month) pay cycle
///
/// `month0` is zero based: January is `0`, December is `11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i32,
    month0: u32,
}

impl Period {
    /// Build a period, rejecting a month index outside `0..=11`
    pub fn new(year: i32, month0: u32) -> Option<Self> {
        (month0 < 12).then_some(Self { year, month0 })
    }

    /// The pay cycle to fetch when running on `today`: the month that
    /// contains the last day of the previous calendar month.
    pub fn previous_month_of(today: NaiveDate) -> Self {
        let first_of_month = today.with_day(1).unwrap_or(today);
        let last_of_previous = first_of_month - Duration::days(1);
        Self {
            year: last_of_previous.year(),
            month0: last_of_previous.month0(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Zero based month index
    pub fn month0(&self) -> u32 {
        self.month0
    }

    /// Calendar month number, 1 to 12
    pub fn month_number(&self) -> u32 {
        self.month0 + 1
    }
}

/// Renders as `M/YYYY`, e.g. `2/2024`
impl Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month_number(), self.year)
    }
}

//! Calendar months and billing period keys.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};

use crate::error::{Result, TallyError};

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(TallyError::InvalidMonthKey(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn current() -> Self {
        Self::of(Local::now().date_naive())
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses an optional override, falling back to the current month.
    pub fn parse_or_current(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(s) => s.parse(),
            None => Ok(Self::current()),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    #[cfg(test)]
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // month and year are validated on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.day(31)
    }

    /// The given day of this month, clamped to the month's last valid day.
    pub fn day(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, days_in_month(self.year, self.month));
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or_default()
    }

    /// Months from `self` through `end`, inclusive. Empty when `end < self`.
    pub fn through(self, end: MonthKey) -> impl Iterator<Item = MonthKey> {
        std::iter::successors(Some(self), |m| Some(m.succ())).take_while(move |m| *m <= end)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TallyError::InvalidMonthKey(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 || !y.chars().chain(m.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// The billing cycle a subscription transaction covers: a month for monthly
/// cadence, a calendar year for yearly cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKey {
    Month(MonthKey),
    Year(i32),
}

impl PeriodKey {
    /// The last month this period accounts for.
    pub fn covered_through(&self) -> MonthKey {
        match self {
            Self::Month(m) => *m,
            Self::Year(y) => MonthKey {
                year: *y,
                month: 12,
            },
        }
    }
}

impl PartialOrd for PeriodKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by the last month covered. A month sorts before the year that ends
/// on it, so `Month(2024-12) < Year(2024)`.
impl Ord for PeriodKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let rank = |p: &Self| match p {
            Self::Month(_) => 0,
            Self::Year(_) => 1,
        };
        (self.covered_through(), rank(self)).cmp(&(other.covered_through(), rank(other)))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month(m) => m.fmt(f),
            Self::Year(y) => write!(f, "{y:04}"),
        }
    }
}

impl FromStr for PeriodKey {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
            let year = s
                .parse()
                .map_err(|_| TallyError::InvalidMonthKey(s.to_string()))?;
            return Ok(Self::Year(year));
        }
        s.parse().map(Self::Month)
    }
}

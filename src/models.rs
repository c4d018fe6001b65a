use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::TallyError;
use crate::period::{MonthKey, PeriodKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Income is stored positive, expenses negative, whatever sign was typed.
    pub fn normalize(&self, cents: i64) -> i64 {
        match self {
            Self::Income => cents.abs(),
            Self::Expense => -cents.abs(),
        }
    }
}

impl FromStr for CategoryKind {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(TallyError::InvalidCategoryKind(s.to_string())),
        }
    }
}

/// Budget bucket a category's spending counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Needs,
    Wants,
    Savings,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::Needs, Group::Wants, Group::Savings];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Needs => "needs",
            Self::Wants => "wants",
            Self::Savings => "savings",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Needs => "Needs",
            Self::Wants => "Wants",
            Self::Savings => "Savings",
        };
        f.write_str(label)
    }
}

impl FromStr for Group {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "needs" => Ok(Self::Needs),
            "wants" => Ok(Self::Wants),
            "savings" => Ok(Self::Savings),
            _ => Err(TallyError::InvalidGroup(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: CategoryKind,
    pub group: Option<Group>,
}

/// Where a ledger entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Manual,
    Subscription {
        subscription_id: i64,
        period: PeriodKey,
    },
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    /// Signed, in cents.
    pub amount: i64,
    pub category_id: i64,
    pub description: String,
    pub origin: Origin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Monthly { day: u32 },
    Yearly { month: u32, day: u32 },
}

impl Cadence {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Monthly { .. } => "monthly",
            Self::Yearly { .. } => "yearly",
        }
    }

    pub fn day(&self) -> u32 {
        match self {
            Self::Monthly { day } | Self::Yearly { day, .. } => *day,
        }
    }

    pub fn anchor_month(&self) -> Option<u32> {
        match self {
            Self::Monthly { .. } => None,
            Self::Yearly { month, .. } => Some(*month),
        }
    }

    /// Build a cadence from its stored columns, validating the anchors.
    pub fn from_parts(name: &str, day: u32, month: Option<u32>) -> Result<Self, TallyError> {
        if !(1..=31).contains(&day) {
            return Err(TallyError::InvalidCadence(format!("day must be 1-31, got {day}")));
        }
        match (name, month) {
            ("monthly", _) => Ok(Self::Monthly { day }),
            ("yearly", Some(m)) if (1..=12).contains(&m) => Ok(Self::Yearly { month: m, day }),
            ("yearly", Some(m)) => Err(TallyError::InvalidCadence(format!(
                "month of year must be 1-12, got {m}"
            ))),
            ("yearly", None) => Err(TallyError::InvalidCadence(
                "yearly cadence needs a month of year".into(),
            )),
            (other, _) => Err(TallyError::InvalidCadence(format!(
                "{other} (must be 'monthly' or 'yearly')"
            ))),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly { day } => write!(f, "monthly on day {day}"),
            Self::Yearly { month, day } => write!(f, "yearly on {month:02}-{day:02}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: i64,
    pub name: String,
    /// Signed, in cents.
    pub amount: i64,
    pub category_id: i64,
    pub cadence: Cadence,
    pub effective_start: MonthKey,
    pub effective_end: Option<MonthKey>,
    pub last_applied_period: Option<PeriodKey>,
    pub active: bool,
}

/// A subscription transaction the engine intends to write for one period.
#[derive(Debug, Clone)]
pub struct Posting {
    pub subscription_id: i64,
    pub period: PeriodKey,
    pub date: NaiveDate,
    pub amount: i64,
    pub category_id: i64,
    pub description: String,
}

impl Posting {
    pub fn for_period(sub: &Subscription, period: PeriodKey) -> Self {
        let date = match (period, sub.cadence) {
            (PeriodKey::Month(m), cadence) => m.day(cadence.day()),
            (PeriodKey::Year(y), Cadence::Yearly { month, day }) => MonthKey::new(y, month)
                .map(|m| m.day(day))
                .unwrap_or_else(|_| PeriodKey::Year(y).covered_through().first_day()),
            (PeriodKey::Year(y), Cadence::Monthly { day }) => {
                PeriodKey::Year(y).covered_through().day(day)
            }
        };
        Self {
            subscription_id: sub.id,
            period,
            date,
            amount: sub.amount,
            category_id: sub.category_id,
            description: format!("SUB: {}", sub.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(cadence: Cadence) -> Subscription {
        Subscription {
            id: 7,
            name: "Rent".into(),
            amount: -100000,
            category_id: 3,
            cadence,
            effective_start: "2024-01".parse().unwrap(),
            effective_end: None,
            last_applied_period: None,
            active: true,
        }
    }

    #[test]
    fn test_normalize_by_kind() {
        assert_eq!(CategoryKind::Expense.normalize(1250), -1250);
        assert_eq!(CategoryKind::Expense.normalize(-1250), -1250);
        assert_eq!(CategoryKind::Income.normalize(-5000), 5000);
    }

    #[test]
    fn test_kind_and_group_parse_errors_are_typed() {
        assert_eq!(" Income ".parse::<CategoryKind>().unwrap(), CategoryKind::Income);
        assert!(matches!("asset".parse::<CategoryKind>(), Err(TallyError::InvalidCategoryKind(k)) if k == "asset"));
        assert_eq!("SAVINGS".parse::<Group>().unwrap(), Group::Savings);
        assert!(matches!("luxury".parse::<Group>(), Err(TallyError::InvalidGroup(g)) if g == "luxury"));
    }

    #[test]
    fn test_cadence_validation() {
        assert!(Cadence::from_parts("monthly", 31, None).is_ok());
        assert!(Cadence::from_parts("monthly", 0, None).is_err());
        assert!(Cadence::from_parts("monthly", 32, None).is_err());
        assert!(Cadence::from_parts("yearly", 1, None).is_err());
        assert!(Cadence::from_parts("yearly", 1, Some(13)).is_err());
        assert!(Cadence::from_parts("weekly", 1, None).is_err());
        assert_eq!(
            Cadence::from_parts("yearly", 15, Some(6)).unwrap(),
            Cadence::Yearly { month: 6, day: 15 }
        );
    }

    #[test]
    fn test_posting_clamps_anchor_day() {
        let s = sub(Cadence::Monthly { day: 31 });
        let p = Posting::for_period(&s, PeriodKey::Month("2023-02".parse().unwrap()));
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
        assert_eq!(p.description, "SUB: Rent");
        assert_eq!(p.amount, -100000);
    }

    #[test]
    fn test_yearly_posting_lands_in_anchor_month() {
        let s = sub(Cadence::Yearly { month: 6, day: 31 });
        let p = Posting::for_period(&s, PeriodKey::Year(2024));
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(p.period.to_string(), "2024");
    }
}

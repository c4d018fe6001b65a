use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, TallyError};
use crate::models::Group;
use crate::period::MonthKey;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Targets {
    pub needs: f64,
    pub wants: f64,
    pub savings: f64,
}

impl Targets {
    pub fn for_group(&self, group: Group) -> f64 {
        match group {
            Group::Needs => self.needs,
            Group::Wants => self.wants,
            Group::Savings => self.savings,
        }
    }
}

impl Default for Targets {
    fn default() -> Self {
        Self { needs: 50.0, wants: 30.0, savings: 20.0 }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryTotal {
    pub name: String,
    pub group: Option<Group>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub group: Group,
    pub target_pct: f64,
    pub planned: i64,
    pub actual: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone)]
pub struct MonthSummary {
    pub month: MonthKey,
    pub income: Option<i64>,
    pub net: i64,
    pub by_category: Vec<CategoryTotal>,
    pub groups: Vec<GroupSummary>,
    /// Spending in categories mapped to no group.
    pub uncategorized: i64,
}

pub fn set_income(conn: &Connection, month: MonthKey, cents: i64) -> Result<()> {
    if cents < 0 {
        return Err(TallyError::InvalidAmount(format!("income cannot be negative: {cents}")));
    }
    conn.execute(
        "INSERT INTO monthly_income (month, amount) VALUES (?1, ?2) \
         ON CONFLICT(month) DO UPDATE SET amount = excluded.amount",
        rusqlite::params![month.to_string(), cents],
    )?;
    Ok(())
}

pub fn income_for(conn: &Connection, month: MonthKey) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT amount FROM monthly_income WHERE month = ?1",
            [month.to_string()],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn set_targets(conn: &Connection, targets: Targets) -> Result<()> {
    let parts = [targets.needs, targets.wants, targets.savings];
    if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(TallyError::InvalidTargets("percentages must be non-negative".into()));
    }
    let sum: f64 = parts.iter().sum();
    if (sum - 100.0).abs() > 1e-6 {
        return Err(TallyError::InvalidTargets(format!("must sum to 100, got {sum}")));
    }
    conn.execute(
        "INSERT INTO budget_targets (id, needs, wants, savings) VALUES (1, ?1, ?2, ?3) \
         ON CONFLICT(id) DO UPDATE SET needs = excluded.needs, wants = excluded.wants, savings = excluded.savings",
        rusqlite::params![targets.needs, targets.wants, targets.savings],
    )?;
    tracing::info!(
        needs = targets.needs,
        wants = targets.wants,
        savings = targets.savings,
        "updated budget targets"
    );
    Ok(())
}

pub fn targets(conn: &Connection) -> Result<Targets> {
    let targets = conn
        .query_row("SELECT needs, wants, savings FROM budget_targets WHERE id = 1", [], |row| {
            Ok(Targets { needs: row.get(0)?, wants: row.get(1)?, savings: row.get(2)? })
        })
        .optional()?;
    Ok(targets.unwrap_or_default())
}

/// Totals for one month against the planned needs/wants/savings split.
pub fn month_summary(conn: &Connection, month: MonthKey) -> Result<MonthSummary> {
    let from = month.first_day();
    let to = month.last_day();

    let mut stmt = conn.prepare(
        "SELECT c.name, c.budget_group, SUM(t.amount) \
         FROM transactions t JOIN categories c ON t.category_id = c.id \
         WHERE t.date BETWEEN ?1 AND ?2 \
         GROUP BY c.id ORDER BY SUM(t.amount) ASC, c.name",
    )?;
    let by_category = stmt
        .query_map(rusqlite::params![from, to], |row| {
            let group: Option<String> = row.get(1)?;
            Ok(CategoryTotal {
                name: row.get(0)?,
                group: group.and_then(|g| g.parse().ok()),
                total: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut spend_stmt = conn.prepare(
        "SELECT c.budget_group, COALESCE(SUM(-t.amount), 0) \
         FROM transactions t JOIN categories c ON t.category_id = c.id \
         WHERE t.date BETWEEN ?1 AND ?2 AND t.amount < 0 \
         GROUP BY c.budget_group",
    )?;
    let spend: Vec<(Option<String>, i64)> = spend_stmt
        .query_map(rusqlite::params![from, to], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let income = income_for(conn, month)?;
    let targets = targets(conn)?;
    let groups = Group::ALL
        .iter()
        .map(|&group| {
            let target_pct = targets.for_group(group);
            let planned = income.map_or(0, |i| (i as f64 * target_pct / 100.0).round() as i64);
            let actual = spend
                .iter()
                .find(|(g, _)| g.as_deref() == Some(group.as_str()))
                .map_or(0, |(_, cents)| *cents);
            GroupSummary { group, target_pct, planned, actual, remaining: planned - actual }
        })
        .collect();
    let uncategorized = spend
        .iter()
        .find(|(g, _)| g.is_none())
        .map_or(0, |(_, cents)| *cents);

    Ok(MonthSummary {
        month,
        income,
        net: by_category.iter().map(|c| c.total).sum(),
        by_category,
        groups,
        uncategorized,
    })
}

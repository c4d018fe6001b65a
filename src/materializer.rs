//! Turns recurring subscriptions into concrete ledger transactions.
//!
//! Each run catches every active subscription up to the target month. Every
//! (subscription, period) pair is committed on its own, oldest first, so an
//! interrupted run resumes where it stopped on the next invocation.

use crate::error::{Result, TallyError};
use crate::models::{Cadence, Posting, Subscription, Transaction};
use crate::period::{MonthKey, PeriodKey};
use crate::store::{Candidate, SubscriptionStore};

/// What happened to one subscription during a run.
#[derive(Debug)]
pub struct SubscriptionOutcome {
    pub subscription_id: i64,
    pub name: String,
    pub created: Vec<Transaction>,
    /// Set when a period failed to commit; later periods were not attempted.
    pub failure: Option<TallyError>,
}

#[derive(Debug)]
pub struct ApplyReport {
    pub target: MonthKey,
    pub outcomes: Vec<SubscriptionOutcome>,
}

impl ApplyReport {
    /// Newly created transactions, grouped by subscription and oldest first.
    pub fn created(&self) -> impl Iterator<Item = &Transaction> {
        self.outcomes.iter().flat_map(|o| o.created.iter())
    }

    pub fn created_count(&self) -> usize {
        self.created().count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SubscriptionOutcome> {
        self.outcomes.iter().filter(|o| o.failure.is_some())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.outcomes.into_iter().flat_map(|o| o.created).collect()
    }
}

/// Materialize subscriptions for `target`, or for the current month when no
/// override is given.
pub fn materialize<S: SubscriptionStore>(store: &mut S, target: Option<MonthKey>) -> Result<ApplyReport> {
    materialize_for(store, target.unwrap_or_else(MonthKey::current))
}

pub fn materialize_for<S: SubscriptionStore>(store: &mut S, target: MonthKey) -> Result<ApplyReport> {
    let candidates = store.due_candidates(target).map_err(|e| match e {
        TallyError::StoreUnavailable(_) => e,
        other => TallyError::StoreUnavailable(other.to_string()),
    })?;
    tracing::info!(month = %target, candidates = candidates.len(), "applying subscriptions");

    let mut outcomes = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let sub = match candidate {
            Candidate::Ready(sub) => sub,
            Candidate::Unreadable { id, name, reason } => {
                tracing::warn!(subscription_id = id, error = %reason, "skipping unreadable subscription");
                outcomes.push(SubscriptionOutcome {
                    subscription_id: id,
                    name,
                    created: Vec::new(),
                    failure: Some(TallyError::SubscriptionCommitFailed {
                        subscription_id: id,
                        period: target.to_string(),
                        reason,
                    }),
                });
                continue;
            }
        };
        let outcome = apply_subscription(store, &sub, target)?;
        if !outcome.created.is_empty() {
            tracing::info!(
                subscription_id = sub.id,
                name = %sub.name,
                created = outcome.created.len(),
                "subscription applied"
            );
        }
        outcomes.push(outcome);
    }

    let report = ApplyReport { target, outcomes };
    tracing::info!(
        month = %target,
        created = report.created_count(),
        failed = report.failures().count(),
        "apply finished"
    );
    Ok(report)
}

/// Commit every due period for one subscription. Only a store outage escapes
/// as `Err`; any other failure is recorded on the outcome.
fn apply_subscription<S: SubscriptionStore>(
    store: &mut S,
    sub: &Subscription,
    target: MonthKey,
) -> Result<SubscriptionOutcome> {
    let mut outcome = SubscriptionOutcome {
        subscription_id: sub.id,
        name: sub.name.clone(),
        created: Vec::new(),
        failure: None,
    };

    for period in due_periods(sub, target) {
        let result = store
            .transaction_exists(sub.id, &period)
            .and_then(|exists| {
                if exists {
                    // The commit still runs so a lagging marker catches up.
                    tracing::debug!(subscription_id = sub.id, %period, "already posted");
                }
                store.commit_period(&Posting::for_period(sub, period))
            });

        match result {
            Ok(Some(txn)) => outcome.created.push(txn),
            Ok(None) => {}
            Err(e) if e.is_store_unavailable() => {
                tracing::error!(subscription_id = sub.id, %period, error = %e, "store unavailable");
                return Err(match e {
                    TallyError::StoreUnavailable(_) => e,
                    other => TallyError::StoreUnavailable(other.to_string()),
                });
            }
            Err(e) => {
                tracing::warn!(subscription_id = sub.id, %period, error = %e, "failed to apply period");
                outcome.failure = Some(TallyError::SubscriptionCommitFailed {
                    subscription_id: sub.id,
                    period: period.to_string(),
                    reason: e.to_string(),
                });
                break;
            }
        }
    }

    Ok(outcome)
}

/// Periods after the subscription's marker (or from its start) through
/// `target`, clipped to its effective range, oldest first.
pub fn due_periods(sub: &Subscription, target: MonthKey) -> Vec<PeriodKey> {
    if !sub.active {
        return Vec::new();
    }
    let upper = match sub.effective_end {
        Some(end) if end < target => end,
        _ => target,
    };
    let after = sub.last_applied_period.map(|p| p.covered_through());
    let first = match after {
        Some(covered) if covered >= sub.effective_start => covered.succ(),
        _ => sub.effective_start,
    };

    match sub.cadence {
        Cadence::Monthly { .. } => first.through(upper).map(PeriodKey::Month).collect(),
        Cadence::Yearly { month, .. } => (first.year()..=upper.year())
            .filter_map(|year| MonthKey::new(year, month).ok())
            .filter(|occurrence| *occurrence >= first && *occurrence <= upper)
            .map(|occurrence| PeriodKey::Year(occurrence.year()))
            .collect(),
    }
}

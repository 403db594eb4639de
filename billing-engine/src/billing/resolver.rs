//! Status resolver
//!
//! Combines the member roster with ledger flags to classify every billing
//! candidate of a date as pending, paid or suspended.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use shared::models::{EntryFlags, PaidMember, PaymentChannel, StatusBuckets};
use sqlx::SqliteConnection;

use super::error::{BillingError, BillingResult};
use super::schedule::is_billing_day;
use crate::db::repository::ledger as ledger_repo;
use crate::db::repository::member::{self as member_repo, RosterMember};

/// Status of one member on one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedStatus {
    Pending,
    Paid(PaymentChannel),
    Suspended,
}

/// Suspended > paid > pending; a missing row is pending
pub fn classify(flags: Option<EntryFlags>) -> ResolvedStatus {
    match flags {
        Some(f) if f.suspend => ResolvedStatus::Suspended,
        Some(f) if f.cash => ResolvedStatus::Paid(PaymentChannel::Cash),
        Some(f) if f.online => ResolvedStatus::Paid(PaymentChannel::Online),
        _ => ResolvedStatus::Pending,
    }
}

/// Billing candidate on `target`: admitted by then, not suspended on an
/// earlier date, and `target` is an anniversary day
///
/// A suspension only takes effect from its own date on: the same member is
/// still pending on anniversaries before it.
pub fn is_candidate(entry: &RosterMember, target: NaiveDate) -> bool {
    let suspended_earlier = entry.first_suspended_on.is_some_and(|s| s < target);
    !suspended_earlier && is_billing_day(entry.member.admission_date, target)
}

/// Bucket the candidates of `target`; roster order (name, case-insensitive) is kept
pub fn bucket(
    roster: &[RosterMember],
    flags: &HashMap<i64, EntryFlags>,
    target: NaiveDate,
) -> StatusBuckets {
    let mut buckets = StatusBuckets::default();
    for entry in roster.iter().filter(|e| is_candidate(e, target)) {
        let member = entry.member.clone();
        match classify(flags.get(&member.id).copied()) {
            ResolvedStatus::Pending => buckets.pending.push(member),
            ResolvedStatus::Paid(channel) => buckets.paid.push(PaidMember { member, channel }),
            ResolvedStatus::Suspended => buckets.suspended.push(member),
        }
    }
    buckets
}

/// Days in `[from, to]` on which at least one candidate is pending, ascending
pub fn pending_days_between(
    roster: &[RosterMember],
    entries: &[(i64, NaiveDate, EntryFlags)],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<NaiveDate> {
    let settled: HashSet<(i64, NaiveDate)> = entries
        .iter()
        .filter(|(_, _, flags)| classify(Some(*flags)) != ResolvedStatus::Pending)
        .map(|(member_id, date, _)| (*member_id, *date))
        .collect();

    from.iter_days()
        .take_while(|day| *day <= to)
        .filter(|day| {
            roster
                .iter()
                .filter(|e| is_candidate(e, *day))
                .any(|e| !settled.contains(&(e.member.id, *day)))
        })
        .collect()
}

/// Resolve every candidate's status for `target`
///
/// Reads inside whatever transaction `conn` belongs to; callers pass a read
/// transaction so roster and flags come from one snapshot.
pub async fn resolve_statuses(
    conn: &mut SqliteConnection,
    owner_id: i64,
    target: NaiveDate,
) -> BillingResult<StatusBuckets> {
    let roster = member_repo::roster(&mut *conn, owner_id, target).await?;
    if roster.is_empty() {
        return Ok(StatusBuckets::default());
    }
    let flags: HashMap<i64, EntryFlags> = ledger_repo::flags_on(&mut *conn, owner_id, target)
        .await?
        .into_iter()
        .collect();
    Ok(bucket(&roster, &flags, target))
}

/// Calendar heat-map: pending days of a month up to and including `today`
pub async fn pending_days(
    conn: &mut SqliteConnection,
    owner_id: i64,
    year: i32,
    month: u32,
    today: NaiveDate,
) -> BillingResult<Vec<NaiveDate>> {
    let (first, last) = crate::utils::time::month_bounds(year, month)?;
    let to = last.min(today);
    if to < first {
        return Ok(Vec::new());
    }
    let roster = member_repo::roster(&mut *conn, owner_id, to).await?;
    if roster.is_empty() {
        return Ok(Vec::new());
    }
    let entries = ledger_repo::flags_between(&mut *conn, owner_id, first, to).await?;
    Ok(pending_days_between(&roster, &entries, first, to))
}

/// Single-row lookup
pub async fn lookup_status(
    conn: &mut SqliteConnection,
    owner_id: i64,
    member_id: i64,
    date: NaiveDate,
) -> BillingResult<Option<EntryFlags>> {
    if member_repo::find_by_id(&mut *conn, owner_id, member_id)
        .await?
        .is_none()
    {
        return Err(BillingError::member_not_found(member_id));
    }
    let row = ledger_repo::find(&mut *conn, owner_id, member_id, date).await?;
    Ok(row.map(|r| r.flags()))
}

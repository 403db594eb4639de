//! Payment ledger operations
//!
//! Each upsert is an explicit read-modify-write on one (member, date) row
//! inside the caller's transaction, followed by the matching rollup delta.
//! Nothing here commits; dropping the transaction undoes both.

use chrono::NaiveDate;
use shared::models::{EntryFlags, PaymentChannel};
use sqlx::SqliteConnection;

use super::error::BillingResult;
use crate::db::repository::ledger::{self as ledger_repo, EntryRow, EntryValues};
use crate::db::repository::rollup as rollup_repo;

/// What one row contributes to the rollup, in cents: `(cash, online)`
///
/// Suspension wins over payment, cash wins over online.
pub fn contribution(flags: EntryFlags, amount_paid_cents: i64) -> (i64, i64) {
    if flags.suspend {
        (0, 0)
    } else if flags.cash {
        (amount_paid_cents, 0)
    } else if flags.online {
        (0, amount_paid_cents)
    } else {
        (0, 0)
    }
}

fn row_contribution(row: Option<&EntryRow>) -> (i64, i64) {
    row.map_or((0, 0), |r| contribution(r.flags(), r.amount_paid_cents))
}

/// Target state of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryChange {
    /// Paid through `channel`; `admission_fee_cents` replaces the admission marker when set
    Paid {
        channel: PaymentChannel,
        amount_cents: i64,
        admission_fee_cents: Option<i64>,
    },
    Suspended,
    /// Tracked but unresolved
    Pending,
}

impl EntryChange {
    pub fn paid(channel: PaymentChannel, amount_cents: i64) -> Self {
        Self::Paid {
            channel,
            amount_cents,
            admission_fee_cents: None,
        }
    }

    fn values(&self, prior: Option<&EntryRow>) -> EntryValues {
        let kept_marker = prior.map_or(0, |r| r.amount_for_new_cents);
        match *self {
            Self::Paid {
                channel,
                amount_cents,
                admission_fee_cents,
            } => EntryValues {
                cash: channel == PaymentChannel::Cash,
                online: channel == PaymentChannel::Online,
                suspend: false,
                amount_paid_cents: amount_cents,
                amount_for_new_cents: admission_fee_cents.unwrap_or(kept_marker),
            },
            Self::Suspended => EntryValues {
                cash: false,
                online: false,
                suspend: true,
                amount_paid_cents: 0,
                amount_for_new_cents: kept_marker,
            },
            Self::Pending => EntryValues {
                cash: false,
                online: false,
                suspend: false,
                amount_paid_cents: 0,
                amount_for_new_cents: kept_marker,
            },
        }
    }
}

/// Upsert one (member, date) row and apply the rollup delta
///
/// Returns the stored row. Re-applying the same change is a no-op for the
/// rollup since the delta is new contribution minus old contribution.
pub async fn apply(
    conn: &mut SqliteConnection,
    owner_id: i64,
    member_id: i64,
    date: NaiveDate,
    change: EntryChange,
) -> BillingResult<EntryRow> {
    let prior = ledger_repo::find(&mut *conn, owner_id, member_id, date).await?;
    let values = change.values(prior.as_ref());

    let stored = match &prior {
        Some(row) => ledger_repo::update(&mut *conn, row, &values).await?,
        None => ledger_repo::insert(&mut *conn, owner_id, member_id, date, &values).await?,
    };

    let (old_cash, old_online) = row_contribution(prior.as_ref());
    let (new_cash, new_online) = row_contribution(Some(&stored));
    rollup_repo::add_delta(
        &mut *conn,
        owner_id,
        date,
        new_cash - old_cash,
        new_online - old_online,
    )
    .await?;

    tracing::debug!(
        owner_id,
        member_id,
        date = %date,
        cash_delta = new_cash - old_cash,
        online_delta = new_online - old_online,
        "Ledger entry upserted"
    );
    Ok(stored)
}

/// Delete every suspended row of a member; returns the number removed
///
/// Suspended rows contribute nothing, but stale paid flags on them are still
/// backed out of the rollup so the cache stays derivable from the ledger.
pub async fn reactivate(
    conn: &mut SqliteConnection,
    owner_id: i64,
    member_id: i64,
) -> BillingResult<u64> {
    let suspended = ledger_repo::find_suspended(&mut *conn, owner_id, member_id).await?;
    for row in &suspended {
        let (cash, online) = row_contribution(Some(row));
        rollup_repo::add_delta(&mut *conn, owner_id, row.billing_date, -cash, -online).await?;
    }
    let removed = ledger_repo::delete_suspended(&mut *conn, owner_id, member_id).await?;
    Ok(removed)
}

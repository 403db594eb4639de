//! Period aggregator and collection rollup reads

use chrono::NaiveDate;
use shared::models::{CollectionCounts, CollectionQuery, CollectionTotals};
use sqlx::SqliteConnection;

use super::error::{BillingError, BillingResult};
use super::money::from_cents;
use crate::db::repository::ledger as ledger_repo;
use crate::db::repository::rollup as rollup_repo;

fn totals((cash, online): (i64, i64)) -> CollectionTotals {
    CollectionTotals {
        total_cash: from_cents(cash),
        total_online: from_cents(online),
    }
}

/// Validate a query and return its inclusive bounds
pub fn query_bounds(query: CollectionQuery) -> BillingResult<(NaiveDate, NaiveDate)> {
    match query {
        CollectionQuery::Day { date } => Ok((date, date)),
        CollectionQuery::Range { from, to } if from > to => Err(BillingError::invalid(format!(
            "range start {from} is after range end {to}"
        ))),
        CollectionQuery::Range { from, to } => Ok((from, to)),
    }
}

/// Point read of the cache; a missing row is zero
pub async fn rollup_for_day(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> BillingResult<CollectionTotals> {
    let cached = rollup_repo::find(conn, owner_id, date).await?;
    Ok(totals(cached.unwrap_or((0, 0))))
}

/// Cached totals for a day or an inclusive range
pub async fn collection_summary(
    conn: &mut SqliteConnection,
    owner_id: i64,
    query: CollectionQuery,
) -> BillingResult<CollectionTotals> {
    match query {
        CollectionQuery::Day { date } => rollup_for_day(conn, owner_id, date).await,
        CollectionQuery::Range { .. } => {
            let (from, to) = query_bounds(query)?;
            let sums = rollup_repo::sum_between(conn, owner_id, from, to).await?;
            Ok(totals(sums))
        }
    }
}

/// Totals straight from the ledger, bypassing the cache
pub async fn ledger_summary(
    conn: &mut SqliteConnection,
    owner_id: i64,
    query: CollectionQuery,
) -> BillingResult<CollectionTotals> {
    let (from, to) = query_bounds(query)?;
    let sums = ledger_repo::sum_between(conn, owner_id, from, to).await?;
    Ok(totals(sums))
}

pub async fn collection_counts(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> BillingResult<CollectionCounts> {
    Ok(ledger_repo::counts_on(conn, owner_id, date).await?)
}

/// Recompute one day's rollup from the ledger and overwrite the cache
///
/// Returns `(previous, repaired)` so callers can log drift.
pub async fn reconcile(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> BillingResult<(CollectionTotals, CollectionTotals)> {
    let previous = rollup_repo::find(&mut *conn, owner_id, date)
        .await?
        .unwrap_or((0, 0));
    let (cash, online) = ledger_repo::sum_between(&mut *conn, owner_id, date, date).await?;
    rollup_repo::overwrite(&mut *conn, owner_id, date, cash, online).await?;
    Ok((totals(previous), totals((cash, online))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::ledger::{EntryChange, apply};
    use crate::db::repository::{member, owner};
    use crate::db::test_pool;
    use rust_decimal_macros::dec;
    use shared::models::PaymentChannel;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_query_bounds() {
        assert_eq!(
            query_bounds(CollectionQuery::Day { date: d(2024, 3, 1) }).unwrap(),
            (d(2024, 3, 1), d(2024, 3, 1))
        );
        assert!(
            query_bounds(CollectionQuery::Range {
                from: d(2024, 3, 2),
                to: d(2024, 3, 1)
            })
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let pool = test_pool().await;
        let mut tx = pool.begin().await.unwrap();
        let owner_id = owner::create(&mut tx, "Gym", 0).await.unwrap();
        let member_id = member::insert(
            &mut tx,
            owner_id,
            &member::MemberInsert {
                name: "Asha",
                admission_date: d(2024, 1, 15),
                mobile_no: None,
                is_special: false,
                fee_cents: None,
                plan_duration_months: 1,
                next_due_date: d(2024, 2, 15),
            },
        )
        .await
        .unwrap();
        apply(&mut tx, owner_id, member_id, d(2024, 3, 15), EntryChange::paid(PaymentChannel::Online, 30_000))
            .await
            .unwrap();
        // simulate cache drift
        rollup_repo::overwrite(&mut tx, owner_id, d(2024, 3, 15), 999, 1).await.unwrap();

        let (before, after) = reconcile(&mut tx, owner_id, d(2024, 3, 15)).await.unwrap();
        assert_eq!(before.total_cash, dec!(9.99));
        assert_eq!(after.total_online, dec!(300));
        assert_eq!(after.total_cash, dec!(0));

        let day = CollectionQuery::Day { date: d(2024, 3, 15) };
        assert_eq!(
            collection_summary(&mut tx, owner_id, day).await.unwrap(),
            ledger_summary(&mut tx, owner_id, day).await.unwrap()
        );
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_rollup_is_zero() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let owner_id = owner::create(&mut conn, "Gym", 0).await.unwrap();

        let totals = rollup_for_day(&mut conn, owner_id, d(2024, 3, 15)).await.unwrap();
        assert_eq!(totals, CollectionTotals::default());
        let counts = collection_counts(&mut conn, owner_id, d(2024, 3, 15)).await.unwrap();
        assert_eq!(counts, CollectionCounts::default());
    }
}

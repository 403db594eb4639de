//! Collection Rollup Repository (日收款汇总缓存)

use super::RepoResult;
use chrono::NaiveDate;
use sqlx::SqliteConnection;

/// Cached totals for one owner/day in cents; `None` when no row exists
pub async fn find(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> RepoResult<Option<(i64, i64)>> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT total_cash_cents, total_online_cents FROM collection_rollup WHERE owner_id = ? AND collection_date = ?",
    )
    .bind(owner_id)
    .bind(date)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Add a signed per-channel delta, creating the row on first use
pub async fn add_delta(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
    cash_delta: i64,
    online_delta: i64,
) -> RepoResult<()> {
    if cash_delta == 0 && online_delta == 0 {
        return Ok(());
    }
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO collection_rollup (owner_id, collection_date, total_cash_cents, total_online_cents, updated_at) VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (owner_id, collection_date) DO UPDATE SET \
            total_cash_cents = total_cash_cents + excluded.total_cash_cents, \
            total_online_cents = total_online_cents + excluded.total_online_cents, \
            updated_at = excluded.updated_at",
    )
    .bind(owner_id)
    .bind(date)
    .bind(cash_delta)
    .bind(online_delta)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Replace the cached totals (reconciliation only)
pub async fn overwrite(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
    cash_cents: i64,
    online_cents: i64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO collection_rollup (owner_id, collection_date, total_cash_cents, total_online_cents, updated_at) VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (owner_id, collection_date) DO UPDATE SET \
            total_cash_cents = excluded.total_cash_cents, \
            total_online_cents = excluded.total_online_cents, \
            updated_at = excluded.updated_at",
    )
    .bind(owner_id)
    .bind(date)
    .bind(cash_cents)
    .bind(online_cents)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Sum of cached totals over an inclusive date range, in cents
pub async fn sum_between(
    conn: &mut SqliteConnection,
    owner_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> RepoResult<(i64, i64)> {
    let totals = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COALESCE(SUM(total_cash_cents), 0), COALESCE(SUM(total_online_cents), 0) FROM collection_rollup WHERE owner_id = ? AND collection_date BETWEEN ? AND ?",
    )
    .bind(owner_id)
    .bind(from)
    .bind(to)
    .fetch_one(conn)
    .await?;
    Ok(totals)
}

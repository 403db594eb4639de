//! Payment Ledger Repository (缴费台账)

use super::RepoResult;
use crate::billing::money::from_cents;
use chrono::NaiveDate;
use shared::models::{CollectionCounts, EntryFlags, LedgerEntry};
use sqlx::SqliteConnection;

/// Ledger row as stored (amounts in cents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct EntryRow {
    pub id: i64,
    pub owner_id: i64,
    pub member_id: i64,
    pub billing_date: NaiveDate,
    pub cash: bool,
    pub online: bool,
    pub suspend: bool,
    pub amount_paid_cents: i64,
    pub amount_for_new_cents: i64,
    pub updated_at: i64,
}

impl EntryRow {
    pub fn flags(&self) -> EntryFlags {
        EntryFlags {
            cash: self.cash,
            online: self.online,
            suspend: self.suspend,
        }
    }
}

impl From<EntryRow> for LedgerEntry {
    fn from(row: EntryRow) -> Self {
        LedgerEntry {
            id: row.id,
            owner_id: row.owner_id,
            member_id: row.member_id,
            billing_date: row.billing_date,
            cash: row.cash,
            online: row.online,
            suspend: row.suspend,
            amount_paid: from_cents(row.amount_paid_cents),
            amount_for_new: from_cents(row.amount_for_new_cents),
            updated_at: row.updated_at,
        }
    }
}

/// Field values written by an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryValues {
    pub cash: bool,
    pub online: bool,
    pub suspend: bool,
    pub amount_paid_cents: i64,
    pub amount_for_new_cents: i64,
}

const ENTRY_SELECT: &str = "SELECT id, owner_id, member_id, billing_date, cash, online, suspend, amount_paid_cents, amount_for_new_cents, updated_at FROM ledger_entry";

pub async fn find(
    conn: &mut SqliteConnection,
    owner_id: i64,
    member_id: i64,
    date: NaiveDate,
) -> RepoResult<Option<EntryRow>> {
    let sql = format!("{ENTRY_SELECT} WHERE owner_id = ? AND member_id = ? AND billing_date = ?");
    let row = sqlx::query_as::<_, EntryRow>(&sql)
        .bind(owner_id)
        .bind(member_id)
        .bind(date)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    owner_id: i64,
    member_id: i64,
    date: NaiveDate,
    values: &EntryValues,
) -> RepoResult<EntryRow> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO ledger_entry (id, owner_id, member_id, billing_date, cash, online, suspend, amount_paid_cents, amount_for_new_cents, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(id)
    .bind(owner_id)
    .bind(member_id)
    .bind(date)
    .bind(values.cash)
    .bind(values.online)
    .bind(values.suspend)
    .bind(values.amount_paid_cents)
    .bind(values.amount_for_new_cents)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(EntryRow {
        id,
        owner_id,
        member_id,
        billing_date: date,
        cash: values.cash,
        online: values.online,
        suspend: values.suspend,
        amount_paid_cents: values.amount_paid_cents,
        amount_for_new_cents: values.amount_for_new_cents,
        updated_at: now,
    })
}

/// Overwrite all fields of an existing row
pub async fn update(
    conn: &mut SqliteConnection,
    prior: &EntryRow,
    values: &EntryValues,
) -> RepoResult<EntryRow> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE ledger_entry SET cash = ?1, online = ?2, suspend = ?3, amount_paid_cents = ?4, amount_for_new_cents = ?5, updated_at = ?6 WHERE id = ?7 AND owner_id = ?8",
    )
    .bind(values.cash)
    .bind(values.online)
    .bind(values.suspend)
    .bind(values.amount_paid_cents)
    .bind(values.amount_for_new_cents)
    .bind(now)
    .bind(prior.id)
    .bind(prior.owner_id)
    .execute(conn)
    .await?;
    Ok(EntryRow {
        cash: values.cash,
        online: values.online,
        suspend: values.suspend,
        amount_paid_cents: values.amount_paid_cents,
        amount_for_new_cents: values.amount_for_new_cents,
        updated_at: now,
        ..*prior
    })
}

/// Suspended rows of one member
pub async fn find_suspended(
    conn: &mut SqliteConnection,
    owner_id: i64,
    member_id: i64,
) -> RepoResult<Vec<EntryRow>> {
    let sql = format!(
        "{ENTRY_SELECT} WHERE owner_id = ? AND member_id = ? AND suspend = 1 ORDER BY billing_date"
    );
    let rows = sqlx::query_as::<_, EntryRow>(&sql)
        .bind(owner_id)
        .bind(member_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn delete_suspended(
    conn: &mut SqliteConnection,
    owner_id: i64,
    member_id: i64,
) -> RepoResult<u64> {
    let rows =
        sqlx::query("DELETE FROM ledger_entry WHERE owner_id = ? AND member_id = ? AND suspend = 1")
            .bind(owner_id)
            .bind(member_id)
            .execute(conn)
            .await?;
    Ok(rows.rows_affected())
}

/// Flags of every row on one date, keyed by member
pub async fn flags_on(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> RepoResult<Vec<(i64, EntryFlags)>> {
    #[derive(sqlx::FromRow)]
    struct Row {
        member_id: i64,
        #[sqlx(flatten)]
        flags: EntryFlags,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT member_id, cash, online, suspend FROM ledger_entry WHERE owner_id = ? AND billing_date = ?",
    )
    .bind(owner_id)
    .bind(date)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|r| (r.member_id, r.flags)).collect())
}

/// Flags of every row in an inclusive date range
pub async fn flags_between(
    conn: &mut SqliteConnection,
    owner_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> RepoResult<Vec<(i64, NaiveDate, EntryFlags)>> {
    #[derive(sqlx::FromRow)]
    struct Row {
        member_id: i64,
        billing_date: NaiveDate,
        #[sqlx(flatten)]
        flags: EntryFlags,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT member_id, billing_date, cash, online, suspend FROM ledger_entry WHERE owner_id = ? AND billing_date BETWEEN ? AND ?",
    )
    .bind(owner_id)
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| (r.member_id, r.billing_date, r.flags))
        .collect())
}

/// Sum of amount_paid by channel straight from the ledger, in cents
///
/// Suspended rows count for nothing; a row flagged both cash and online counts as cash.
pub async fn sum_between(
    conn: &mut SqliteConnection,
    owner_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> RepoResult<(i64, i64)> {
    let totals = sqlx::query_as::<_, (i64, i64)>(
        "SELECT \
            COALESCE(SUM(CASE WHEN suspend = 0 AND cash = 1 THEN amount_paid_cents ELSE 0 END), 0), \
            COALESCE(SUM(CASE WHEN suspend = 0 AND cash = 0 AND online = 1 THEN amount_paid_cents ELSE 0 END), 0) \
         FROM ledger_entry WHERE owner_id = ? AND billing_date BETWEEN ? AND ?",
    )
    .bind(owner_id)
    .bind(from)
    .bind(to)
    .fetch_one(conn)
    .await?;
    Ok(totals)
}

/// Number of paid rows per channel on one date
pub async fn counts_on(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> RepoResult<CollectionCounts> {
    let counts = sqlx::query_as::<_, CollectionCounts>(
        "SELECT \
            COALESCE(SUM(CASE WHEN suspend = 0 AND cash = 1 THEN 1 ELSE 0 END), 0) AS cash, \
            COALESCE(SUM(CASE WHEN suspend = 0 AND cash = 0 AND online = 1 THEN 1 ELSE 0 END), 0) AS online \
         FROM ledger_entry WHERE owner_id = ? AND billing_date = ?",
    )
    .bind(owner_id)
    .bind(date)
    .fetch_one(conn)
    .await?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{member, owner};
    use crate::db::test_pool;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn paid_cash(cents: i64) -> EntryValues {
        EntryValues {
            cash: true,
            online: false,
            suspend: false,
            amount_paid_cents: cents,
            amount_for_new_cents: 0,
        }
    }

    async fn seed(conn: &mut SqliteConnection) -> (i64, i64) {
        let owner_id = owner::create(conn, "Gym", 50_000).await.unwrap();
        let member_id = member::insert(
            conn,
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
        (owner_id, member_id)
    }

    #[tokio::test]
    async fn test_insert_update_find() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let (owner_id, member_id) = seed(&mut conn).await;

        assert!(find(&mut conn, owner_id, member_id, d(2024, 2, 15)).await.unwrap().is_none());

        let row = insert(&mut conn, owner_id, member_id, d(2024, 2, 15), &paid_cash(50_000))
            .await
            .unwrap();
        let stored = find(&mut conn, owner_id, member_id, d(2024, 2, 15))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, row);

        let online = EntryValues {
            cash: false,
            online: true,
            ..paid_cash(45_000)
        };
        let updated = update(&mut conn, &stored, &online).await.unwrap();
        assert_eq!(updated.id, stored.id);
        let stored = find(&mut conn, owner_id, member_id, d(2024, 2, 15))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.online && !stored.cash);
        assert_eq!(stored.amount_paid_cents, 45_000);
    }

    #[tokio::test]
    async fn test_sums_and_counts_follow_flag_priority() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let (owner_id, member_id) = seed(&mut conn).await;

        insert(&mut conn, owner_id, member_id, d(2024, 2, 15), &paid_cash(50_000))
            .await
            .unwrap();
        // stale conflicting flags: suspend wins, nothing counted
        let stale = EntryValues {
            suspend: true,
            ..paid_cash(50_000)
        };
        insert(&mut conn, owner_id, member_id, d(2024, 3, 15), &stale)
            .await
            .unwrap();

        let sums = sum_between(&mut conn, owner_id, d(2024, 2, 1), d(2024, 3, 31))
            .await
            .unwrap();
        assert_eq!(sums, (50_000, 0));

        let counts = counts_on(&mut conn, owner_id, d(2024, 3, 15)).await.unwrap();
        assert_eq!(counts, CollectionCounts::default());

        assert_eq!(find_suspended(&mut conn, owner_id, member_id).await.unwrap().len(), 1);
        assert_eq!(delete_suspended(&mut conn, owner_id, member_id).await.unwrap(), 1);
        assert!(find_suspended(&mut conn, owner_id, member_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let (owner_id, member_id) = seed(&mut conn).await;

        insert(&mut conn, owner_id, member_id, d(2024, 2, 15), &paid_cash(1))
            .await
            .unwrap();
        let err = insert(&mut conn, owner_id, member_id, d(2024, 2, 15), &paid_cash(2))
            .await
            .unwrap_err();
        assert!(matches!(err, super::super::RepoError::Duplicate(_)));
    }
}

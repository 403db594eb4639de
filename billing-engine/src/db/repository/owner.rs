//! Owner Repository

use super::RepoResult;
use crate::billing::money::from_cents;
use shared::models::Owner;
use sqlx::SqliteConnection;

#[derive(Debug, sqlx::FromRow)]
struct OwnerRow {
    id: i64,
    business_name: String,
    default_fee_cents: i64,
    reminders_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<OwnerRow> for Owner {
    fn from(row: OwnerRow) -> Self {
        Owner {
            id: row.id,
            business_name: row.business_name,
            default_fee: from_cents(row.default_fee_cents),
            reminders_active: row.reminders_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const OWNER_SELECT: &str = "SELECT id, business_name, default_fee_cents, reminders_active, created_at, updated_at FROM owner";

pub async fn create(
    conn: &mut SqliteConnection,
    business_name: &str,
    default_fee_cents: i64,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO owner (id, business_name, default_fee_cents, reminders_active, created_at, updated_at) VALUES (?1, ?2, ?3, 0, ?4, ?4)",
    )
    .bind(id)
    .bind(business_name)
    .bind(default_fee_cents)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(id)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Owner>> {
    let sql = format!("{OWNER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, OwnerRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Owner::from))
}

/// Owner default fee in cents, `None` for an unknown owner
pub async fn default_fee_cents(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<i64>> {
    let fee = sqlx::query_scalar::<_, i64>("SELECT default_fee_cents FROM owner WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(fee)
}

/// Returns false when the owner does not exist
pub async fn set_default_fee(
    conn: &mut SqliteConnection,
    id: i64,
    default_fee_cents: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE owner SET default_fee_cents = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(default_fee_cents)
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Returns false when the owner does not exist
pub async fn set_reminders_active(
    conn: &mut SqliteConnection,
    id: i64,
    active: bool,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE owner SET reminders_active = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(active)
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Owners that opted into the daily due sweep
pub async fn find_with_reminders(conn: &mut SqliteConnection) -> RepoResult<Vec<Owner>> {
    let sql = format!("{OWNER_SELECT} WHERE reminders_active = 1 ORDER BY id");
    let rows = sqlx::query_as::<_, OwnerRow>(&sql).fetch_all(conn).await?;
    Ok(rows.into_iter().map(Owner::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_owner_crud() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = create(&mut conn, "Iron Gym", 50_000).await.unwrap();
        let owner = find_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(owner.business_name, "Iron Gym");
        assert_eq!(owner.default_fee, dec!(500.00));
        assert!(!owner.reminders_active);

        assert!(set_default_fee(&mut conn, id, 60_000).await.unwrap());
        assert_eq!(default_fee_cents(&mut conn, id).await.unwrap(), Some(60_000));

        assert!(set_reminders_active(&mut conn, id, true).await.unwrap());
        let with_reminders = find_with_reminders(&mut conn).await.unwrap();
        assert_eq!(with_reminders.len(), 1);
        assert_eq!(with_reminders[0].id, id);
    }

    #[tokio::test]
    async fn test_unknown_owner() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(find_by_id(&mut conn, 404).await.unwrap().is_none());
        assert!(default_fee_cents(&mut conn, 404).await.unwrap().is_none());
        assert!(!set_default_fee(&mut conn, 404, 100).await.unwrap());
        assert!(!set_reminders_active(&mut conn, 404, true).await.unwrap());
    }
}

//! Member Repository (会员计划存储)

use super::{RepoError, RepoResult};
use crate::billing::money::from_cents;
use chrono::NaiveDate;
use shared::models::{Member, MemberWithSuspension};
use sqlx::SqliteConnection;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MemberRow {
    id: i64,
    owner_id: i64,
    name: String,
    admission_date: NaiveDate,
    mobile_no: Option<String>,
    is_special: bool,
    fee_cents: Option<i64>,
    plan_duration_months: i64,
    next_due_date: Option<NaiveDate>,
    created_at: i64,
    updated_at: i64,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            admission_date: row.admission_date,
            mobile_no: row.mobile_no,
            is_special: row.is_special,
            fee_amount: row.fee_cents.map(from_cents),
            // CHECK (plan_duration_months >= 1)
            plan_duration_months: u32::try_from(row.plan_duration_months).unwrap_or(1),
            next_due_date: row.next_due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Member plus the earliest date it was suspended on, if any
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RosterRow {
    #[sqlx(flatten)]
    member: MemberRow,
    first_suspended_on: Option<NaiveDate>,
}

/// Roster entry used by the status resolver
#[derive(Debug, Clone)]
pub struct RosterMember {
    pub member: Member,
    pub first_suspended_on: Option<NaiveDate>,
}

impl From<RosterRow> for RosterMember {
    fn from(row: RosterRow) -> Self {
        RosterMember {
            member: row.member.into(),
            first_suspended_on: row.first_suspended_on,
        }
    }
}

const MEMBER_COLUMNS: &str = "m.id, m.owner_id, m.name, m.admission_date, m.mobile_no, m.is_special, m.fee_cents, m.plan_duration_months, m.next_due_date, m.created_at, m.updated_at";

/// Case-folded name used for uniqueness, ordering and search
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// New member row
pub struct MemberInsert<'a> {
    pub name: &'a str,
    pub admission_date: NaiveDate,
    pub mobile_no: Option<&'a str>,
    pub is_special: bool,
    pub fee_cents: Option<i64>,
    pub plan_duration_months: u32,
    pub next_due_date: NaiveDate,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    owner_id: i64,
    data: &MemberInsert<'_>,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO member (id, owner_id, name, name_key, admission_date, mobile_no, is_special, fee_cents, plan_duration_months, next_due_date, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
    )
    .bind(id)
    .bind(owner_id)
    .bind(data.name)
    .bind(name_key(data.name))
    .bind(data.admission_date)
    .bind(data.mobile_no)
    .bind(data.is_special)
    .bind(data.fee_cents)
    .bind(data.plan_duration_months)
    .bind(data.next_due_date)
    .bind(now)
    .execute(conn)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate(data.name.to_string()),
        other => other,
    })?;
    Ok(id)
}

/// Owner-scoped lookup; another owner's member is indistinguishable from a missing one
pub async fn find_by_id(
    conn: &mut SqliteConnection,
    owner_id: i64,
    id: i64,
) -> RepoResult<Option<Member>> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM member m WHERE m.id = ? AND m.owner_id = ?");
    let row = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Member::from))
}

/// Profile edit; `None` fields are left unchanged. Returns false when no row matched.
pub async fn update_profile(
    conn: &mut SqliteConnection,
    owner_id: i64,
    id: i64,
    name: Option<&str>,
    mobile_no: Option<&str>,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE member SET name = COALESCE(?1, name), name_key = COALESCE(?6, name_key), mobile_no = COALESCE(?2, mobile_no), updated_at = ?3 WHERE id = ?4 AND owner_id = ?5",
    )
    .bind(name)
    .bind(mobile_no)
    .bind(now)
    .bind(id)
    .bind(owner_id)
    .bind(name.map(name_key))
    .execute(conn)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate(name.unwrap_or_default().to_string()),
        other => other,
    })?;
    Ok(rows.rows_affected() > 0)
}

/// Switch to a custom plan. `is_special` only ever goes from 0 to 1.
pub async fn update_plan(
    conn: &mut SqliteConnection,
    owner_id: i64,
    id: i64,
    fee_cents: i64,
    plan_duration_months: u32,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE member SET fee_cents = ?1, plan_duration_months = ?2, is_special = 1, updated_at = ?3 WHERE id = ?4 AND owner_id = ?5",
    )
    .bind(fee_cents)
    .bind(plan_duration_months)
    .bind(now)
    .bind(id)
    .bind(owner_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn set_next_due_date(
    conn: &mut SqliteConnection,
    owner_id: i64,
    id: i64,
    next_due_date: NaiveDate,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE member SET next_due_date = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
    )
    .bind(next_due_date)
    .bind(now)
    .bind(id)
    .bind(owner_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// All members of an owner with their current suspension flag, by name
pub async fn find_all_with_suspension(
    conn: &mut SqliteConnection,
    owner_id: i64,
) -> RepoResult<Vec<MemberWithSuspension>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS}, EXISTS (SELECT 1 FROM ledger_entry l WHERE l.member_id = m.id AND l.owner_id = m.owner_id AND l.suspend = 1) AS is_suspended FROM member m WHERE m.owner_id = ? ORDER BY m.name_key ASC, m.id ASC"
    );

    #[derive(sqlx::FromRow)]
    struct Row {
        #[sqlx(flatten)]
        member: MemberRow,
        is_suspended: bool,
    }

    let rows = sqlx::query_as::<_, Row>(&sql)
        .bind(owner_id)
        .fetch_all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|r| MemberWithSuspension {
            member: r.member.into(),
            is_suspended: r.is_suspended,
        })
        .collect())
}

/// Case-insensitive substring match on the name
pub async fn search(
    conn: &mut SqliteConnection,
    owner_id: i64,
    term: &str,
) -> RepoResult<Vec<Member>> {
    let pattern = format!(
        "%{}%",
        name_key(term)
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    );
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM member m WHERE m.owner_id = ? AND m.name_key LIKE ? ESCAPE '\\' ORDER BY m.name_key ASC, m.id ASC"
    );
    let rows = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(owner_id)
        .bind(pattern)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Member::from).collect())
}

pub async fn find_admitted_on(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> RepoResult<Vec<Member>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM member m WHERE m.owner_id = ? AND m.admission_date = ? ORDER BY m.name_key ASC, m.id ASC"
    );
    let rows = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(owner_id)
        .bind(date)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Member::from).collect())
}

/// Members whose cached next due date is `date`
pub async fn find_due_on(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> RepoResult<Vec<Member>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM member m WHERE m.owner_id = ? AND m.next_due_date = ? ORDER BY m.name_key ASC, m.id ASC"
    );
    let rows = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(owner_id)
        .bind(date)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Member::from).collect())
}

/// Members admitted on or before `date`, with their first suspension date
pub async fn roster(
    conn: &mut SqliteConnection,
    owner_id: i64,
    date: NaiveDate,
) -> RepoResult<Vec<RosterMember>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS}, (SELECT MIN(l.billing_date) FROM ledger_entry l WHERE l.member_id = m.id AND l.owner_id = m.owner_id AND l.suspend = 1) AS first_suspended_on FROM member m WHERE m.owner_id = ? AND m.admission_date <= ? ORDER BY m.name_key ASC, m.id ASC"
    );
    let rows = sqlx::query_as::<_, RosterRow>(&sql)
        .bind(owner_id)
        .bind(date)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(RosterMember::from).collect())
}

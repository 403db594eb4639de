//! Billing Service
//!
//! Facade over the ledger, resolver and aggregator. Every write runs in one
//! transaction that the service begins and commits; an error on any step
//! drops the transaction and leaves no partial state. Writes that lose a
//! race (`ConflictAborted`) are replayed from scratch up to `retry_limit`
//! times.

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{
    CollectionCounts, CollectionQuery, CollectionTotals, EntryFlags, EntryStatus, LedgerEntry,
    Member, MemberCreate, MemberUpdate, MemberWithSuspension, Owner, PaymentChannel,
    PaymentReceipt, PlanOverride, StatusBuckets,
};
use sqlx::SqlitePool;

use super::aggregator;
use super::error::{BillingError, BillingResult};
use super::ledger::{self, EntryChange};
use super::money::{from_cents, to_cents};
use super::resolver;
use super::schedule::{compute_due_dates, compute_next_due_date, validate_months};
use crate::db::repository::RepoError;
use crate::db::repository::member as member_repo;
use crate::db::repository::owner as owner_repo;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, normalize_optional, validate_optional_text,
    validate_required_text,
};

/// Linear back-off step between conflict retries
const RETRY_BASE_DELAY: Duration = Duration::from_millis(25);

/// Default number of replays after a write conflict
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

#[derive(Clone)]
pub struct BillingService {
    pool: SqlitePool,
    retry_limit: u32,
}

impl BillingService {
    pub fn new(pool: SqlitePool, retry_limit: u32) -> Self {
        Self { pool, retry_limit }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run one logical write, replaying it after `ConflictAborted`
    async fn retrying<T, F, Fut>(&self, op: &'static str, mut attempt: F) -> BillingResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BillingResult<T>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(e) if e.is_retryable() && retries < self.retry_limit => {
                    retries += 1;
                    let delay = RETRY_BASE_DELAY * retries;
                    tracing::warn!(
                        op,
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Write conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!(op, retries, error = %e, "Write conflict, giving up");
                    }
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }

    // ========== Owners ==========

    pub async fn create_owner(&self, business_name: &str, default_fee: Decimal) -> BillingResult<Owner> {
        let name = business_name.trim();
        validate_required_text(name, "business_name", MAX_NAME_LEN)?;
        let fee_cents = to_cents(default_fee, "default_fee")?;

        let owner = self
            .retrying("create_owner", || async move {
                let mut tx = self.pool.begin().await?;
                let id = owner_repo::create(&mut tx, name, fee_cents).await?;
                let owner = owner_repo::find_by_id(&mut tx, id)
                    .await?
                    .ok_or_else(|| BillingError::owner_not_found(id))?;
                tx.commit().await?;
                Ok(owner)
            })
            .await?;

        crate::audit_log!(format!("owner:{}", owner.id), "create_owner", owner.business_name);
        Ok(owner)
    }

    pub async fn get_owner(&self, owner_id: i64) -> BillingResult<Owner> {
        let mut conn = self.pool.acquire().await?;
        owner_repo::find_by_id(&mut conn, owner_id)
            .await?
            .ok_or_else(|| BillingError::owner_not_found(owner_id))
    }

    pub async fn set_default_fee(&self, owner_id: i64, amount: Decimal) -> BillingResult<()> {
        let fee_cents = to_cents(amount, "default_fee")?;
        self.retrying("set_default_fee", || async move {
            let mut tx = self.pool.begin().await?;
            if !owner_repo::set_default_fee(&mut tx, owner_id, fee_cents).await? {
                return Err(BillingError::owner_not_found(owner_id));
            }
            tx.commit().await?;
            Ok(())
        })
        .await?;

        crate::audit_log!(
            format!("owner:{owner_id}"),
            "set_default_fee",
            format!("owner:{owner_id}"),
            from_cents(fee_cents)
        );
        Ok(())
    }

    pub async fn set_reminders_active(&self, owner_id: i64, active: bool) -> BillingResult<()> {
        self.retrying("set_reminders_active", || async move {
            let mut tx = self.pool.begin().await?;
            if !owner_repo::set_reminders_active(&mut tx, owner_id, active).await? {
                return Err(BillingError::owner_not_found(owner_id));
            }
            tx.commit().await?;
            Ok(())
        })
        .await?;

        crate::audit_log!(
            format!("owner:{owner_id}"),
            "set_reminders_active",
            format!("owner:{owner_id}"),
            active
        );
        Ok(())
    }

    /// Owners that opted into the daily due sweep
    pub async fn owners_with_reminders(&self) -> BillingResult<Vec<Owner>> {
        let mut conn = self.pool.acquire().await?;
        Ok(owner_repo::find_with_reminders(&mut conn).await?)
    }

    // ========== Members ==========

    /// Register a member, prepaying a custom plan and recording the admission fee
    pub async fn register_member(&self, owner_id: i64, data: MemberCreate) -> BillingResult<Member> {
        let name = data.name.trim().to_string();
        validate_required_text(&name, "name", MAX_NAME_LEN)?;
        let mobile_no = normalize_optional(data.mobile_no.clone());
        validate_optional_text(&mobile_no, "mobile_no", MAX_SHORT_TEXT_LEN)?;

        // 自定义套餐: 金额和月数必须同时给出
        let plan = match (data.fee_amount, data.plan_duration_months) {
            (Some(fee), Some(months)) => {
                validate_months(months)?;
                Some((to_cents(fee, "fee_amount")?, months))
            }
            (None, None) => None,
            _ => {
                return Err(BillingError::invalid(
                    "fee_amount and plan_duration_months must be given together",
                ));
            }
        };
        let admission_fee_cents = match data.admission_fee {
            Some(fee) => to_cents(fee, "admission_fee")?,
            None => 0,
        };

        let registration = Registration {
            name: &name,
            mobile_no: mobile_no.as_deref(),
            admission_date: data.admission_date,
            plan,
            admission_fee_cents,
            channel: data.channel,
        };
        let member = self
            .retrying("register_member", || {
                self.register_member_once(owner_id, &registration)
            })
            .await?;

        crate::audit_log!(
            format!("owner:{owner_id}"),
            "register_member",
            format!("member:{}", member.id),
            member.name
        );
        Ok(member)
    }

    async fn register_member_once(
        &self,
        owner_id: i64,
        reg: &Registration<'_>,
    ) -> BillingResult<Member> {
        let mut tx = self.pool.begin().await?;
        if owner_repo::default_fee_cents(&mut tx, owner_id).await?.is_none() {
            return Err(BillingError::owner_not_found(owner_id));
        }

        let months = reg.plan.map_or(1, |(_, months)| months);
        let schedule = compute_due_dates(reg.admission_date, months, reg.admission_date)?;
        let last = schedule.clone().last().unwrap_or(reg.admission_date);
        let next_due_date = compute_next_due_date(reg.admission_date, last)?;

        let member_id = member_repo::insert(
            &mut tx,
            owner_id,
            &member_repo::MemberInsert {
                name: reg.name,
                admission_date: reg.admission_date,
                mobile_no: reg.mobile_no,
                is_special: reg.plan.is_some(),
                fee_cents: reg.plan.map(|(fee, _)| fee),
                plan_duration_months: months,
                next_due_date,
            },
        )
        .await
        .map_err(|e| match e {
            RepoError::Duplicate(_) => BillingError::duplicate_name(reg.name),
            other => other.into(),
        })?;

        let admission_fee = (reg.admission_fee_cents > 0).then_some(reg.admission_fee_cents);
        match reg.plan {
            Some((fee_cents, _)) if fee_cents > 0 => {
                for date in schedule {
                    let extra = if date == reg.admission_date { admission_fee } else { None };
                    let change = EntryChange::Paid {
                        channel: reg.channel,
                        amount_cents: fee_cents + extra.unwrap_or(0),
                        admission_fee_cents: extra,
                    };
                    ledger::apply(&mut tx, owner_id, member_id, date, change).await?;
                }
            }
            _ => {
                if let Some(fee) = admission_fee {
                    let change = EntryChange::Paid {
                        channel: reg.channel,
                        amount_cents: fee,
                        admission_fee_cents: Some(fee),
                    };
                    ledger::apply(&mut tx, owner_id, member_id, reg.admission_date, change).await?;
                }
            }
        }

        let member = member_repo::find_by_id(&mut tx, owner_id, member_id)
            .await?
            .ok_or_else(|| BillingError::member_not_found(member_id))?;
        tx.commit().await?;

        tracing::info!(
            owner_id,
            member_id,
            is_special = member.is_special,
            months,
            next_due = %next_due_date,
            "Member registered"
        );
        Ok(member)
    }

    /// Profile edit; name rules match registration
    pub async fn update_member(
        &self,
        owner_id: i64,
        member_id: i64,
        update: MemberUpdate,
    ) -> BillingResult<Member> {
        let name = update.name.as_deref().map(str::trim);
        if let Some(name) = name {
            validate_required_text(name, "name", MAX_NAME_LEN)?;
        }
        let mobile_no = normalize_optional(update.mobile_no.clone());
        validate_optional_text(&mobile_no, "mobile_no", MAX_SHORT_TEXT_LEN)?;
        let mobile_no = mobile_no.as_deref();

        let member = self
            .retrying("update_member", || async move {
                let mut tx = self.pool.begin().await?;
                let updated = member_repo::update_profile(
                    &mut tx,
                    owner_id,
                    member_id,
                    name,
                    mobile_no,
                )
                .await
                .map_err(|e| match e {
                    RepoError::Duplicate(_) => BillingError::duplicate_name(name.unwrap_or_default()),
                    other => other.into(),
                })?;
                if !updated {
                    return Err(BillingError::member_not_found(member_id));
                }
                let member = member_repo::find_by_id(&mut tx, owner_id, member_id)
                    .await?
                    .ok_or_else(|| BillingError::member_not_found(member_id))?;
                tx.commit().await?;
                Ok(member)
            })
            .await?;

        crate::audit_log!(format!("owner:{owner_id}"), "update_member", format!("member:{member_id}"));
        Ok(member)
    }

    pub async fn get_member(&self, owner_id: i64, member_id: i64) -> BillingResult<Member> {
        let mut conn = self.pool.acquire().await?;
        member_repo::find_by_id(&mut conn, owner_id, member_id)
            .await?
            .ok_or_else(|| BillingError::member_not_found(member_id))
    }

    pub async fn list_members(&self, owner_id: i64) -> BillingResult<Vec<MemberWithSuspension>> {
        let mut conn = self.pool.acquire().await?;
        Ok(member_repo::find_all_with_suspension(&mut conn, owner_id).await?)
    }

    pub async fn search_members(&self, owner_id: i64, term: &str) -> BillingResult<Vec<Member>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(BillingError::invalid("search term must not be empty"));
        }
        validate_required_text(term, "search term", MAX_SHORT_TEXT_LEN)?;
        let mut conn = self.pool.acquire().await?;
        Ok(member_repo::search(&mut conn, owner_id, term).await?)
    }

    pub async fn members_admitted_on(&self, owner_id: i64, date: NaiveDate) -> BillingResult<Vec<Member>> {
        let mut conn = self.pool.acquire().await?;
        Ok(member_repo::find_admitted_on(&mut conn, owner_id, date).await?)
    }

    // ========== Ledger writes ==========

    /// Pay a member's plan starting at `start`
    ///
    /// Without an override the member's own fee (or the owner default) and
    /// plan duration apply. One row per due date, then the cached next due
    /// date moves past the plan; all in one transaction.
    pub async fn pay_months(
        &self,
        owner_id: i64,
        member_id: i64,
        start: NaiveDate,
        channel: PaymentChannel,
        plan_override: Option<PlanOverride>,
    ) -> BillingResult<PaymentReceipt> {
        let plan_override = match plan_override {
            Some(plan) => {
                validate_months(plan.plan_duration_months)?;
                Some((to_cents(plan.fee_amount, "fee_amount")?, plan.plan_duration_months))
            }
            None => None,
        };

        let receipt = self
            .retrying("pay_months", || {
                self.pay_months_once(owner_id, member_id, start, channel, plan_override)
            })
            .await?;

        crate::audit_log!(
            format!("owner:{owner_id}"),
            "pay_months",
            format!("member:{member_id}"),
            format!(
                "{} x {} {} from {}",
                receipt.dates.len(),
                receipt.amount_per_month,
                channel,
                start
            )
        );
        Ok(receipt)
    }

    async fn pay_months_once(
        &self,
        owner_id: i64,
        member_id: i64,
        start: NaiveDate,
        channel: PaymentChannel,
        plan_override: Option<(i64, u32)>,
    ) -> BillingResult<PaymentReceipt> {
        let mut tx = self.pool.begin().await?;
        let member = member_repo::find_by_id(&mut tx, owner_id, member_id)
            .await?
            .ok_or_else(|| BillingError::member_not_found(member_id))?;
        ensure_not_before_admission(&member, start)?;

        let (fee_cents, months) = match plan_override {
            Some((fee_cents, months)) => {
                member_repo::update_plan(&mut tx, owner_id, member_id, fee_cents, months).await?;
                (fee_cents, months)
            }
            None => {
                let fee_cents = match member.fee_amount {
                    Some(fee) => to_cents(fee, "fee_amount")?,
                    None => owner_repo::default_fee_cents(&mut tx, owner_id)
                        .await?
                        .ok_or_else(|| BillingError::owner_not_found(owner_id))?,
                };
                (fee_cents, member.plan_duration_months.max(1))
            }
        };

        let schedule = compute_due_dates(member.admission_date, months, start)?;
        let last = schedule.clone().last().unwrap_or(start);
        let next_due_date = compute_next_due_date(member.admission_date, last)?;

        let mut dates = Vec::with_capacity(schedule.len());
        for date in schedule {
            ledger::apply(
                &mut tx,
                owner_id,
                member_id,
                date,
                EntryChange::paid(channel, fee_cents),
            )
            .await?;
            dates.push(date);
        }
        member_repo::set_next_due_date(&mut tx, owner_id, member_id, next_due_date).await?;
        tx.commit().await?;

        tracing::info!(
            owner_id,
            member_id,
            months,
            channel = %channel,
            next_due = %next_due_date,
            "Plan paid"
        );
        Ok(PaymentReceipt {
            member_id,
            channel,
            dates,
            amount_per_month: from_cents(fee_cents),
            next_due_date,
        })
    }

    /// Record one paid date; overwrites whatever the row held before
    pub async fn record_payment(
        &self,
        owner_id: i64,
        member_id: i64,
        date: NaiveDate,
        channel: PaymentChannel,
        amount: Decimal,
    ) -> BillingResult<LedgerEntry> {
        let amount_cents = to_cents(amount, "amount")?;
        self.write_entry(
            "record_payment",
            owner_id,
            member_id,
            date,
            EntryChange::paid(channel, amount_cents),
        )
        .await
    }

    pub async fn record_suspension(
        &self,
        owner_id: i64,
        member_id: i64,
        date: NaiveDate,
    ) -> BillingResult<LedgerEntry> {
        self.write_entry("record_suspension", owner_id, member_id, date, EntryChange::Suspended)
            .await
    }

    /// Explicit single-date status change
    pub async fn mark_status(
        &self,
        owner_id: i64,
        member_id: i64,
        date: NaiveDate,
        status: EntryStatus,
    ) -> BillingResult<LedgerEntry> {
        let change = match status {
            EntryStatus::Pending => EntryChange::Pending,
            EntryStatus::Suspended => EntryChange::Suspended,
            EntryStatus::Cash(amount) => {
                EntryChange::paid(PaymentChannel::Cash, to_cents(amount, "amount")?)
            }
            EntryStatus::Online(amount) => {
                EntryChange::paid(PaymentChannel::Online, to_cents(amount, "amount")?)
            }
        };
        self.write_entry("mark_status", owner_id, member_id, date, change)
            .await
    }

    async fn write_entry(
        &self,
        op: &'static str,
        owner_id: i64,
        member_id: i64,
        date: NaiveDate,
        change: EntryChange,
    ) -> BillingResult<LedgerEntry> {
        let entry = self
            .retrying(op, || async move {
                let mut tx = self.pool.begin().await?;
                let member = member_repo::find_by_id(&mut tx, owner_id, member_id)
                    .await?
                    .ok_or_else(|| BillingError::member_not_found(member_id))?;
                ensure_not_before_admission(&member, date)?;
                let row = ledger::apply(&mut tx, owner_id, member_id, date, change).await?;
                tx.commit().await?;
                Ok(LedgerEntry::from(row))
            })
            .await?;

        crate::audit_log!(
            format!("owner:{owner_id}"),
            op,
            format!("member:{member_id}"),
            format!("{date} {change:?}")
        );
        Ok(entry)
    }

    /// Remove every suspension of a member; returns the number of rows removed
    pub async fn reactivate(&self, owner_id: i64, member_id: i64) -> BillingResult<u64> {
        let removed = self
            .retrying("reactivate", || async move {
                let mut tx = self.pool.begin().await?;
                if member_repo::find_by_id(&mut tx, owner_id, member_id)
                    .await?
                    .is_none()
                {
                    return Err(BillingError::member_not_found(member_id));
                }
                let removed = ledger::reactivate(&mut tx, owner_id, member_id).await?;
                tx.commit().await?;
                Ok(removed)
            })
            .await?;

        crate::audit_log!(
            format!("owner:{owner_id}"),
            "reactivate",
            format!("member:{member_id}"),
            removed
        );
        Ok(removed)
    }

    // ========== Reads ==========

    pub async fn lookup_status(
        &self,
        owner_id: i64,
        member_id: i64,
        date: NaiveDate,
    ) -> BillingResult<Option<EntryFlags>> {
        let mut conn = self.pool.acquire().await?;
        resolver::lookup_status(&mut conn, owner_id, member_id, date).await
    }

    /// Status buckets for `date`, read from one snapshot
    pub async fn resolve_statuses(&self, owner_id: i64, date: NaiveDate) -> BillingResult<StatusBuckets> {
        let mut tx = self.pool.begin().await?;
        let buckets = resolver::resolve_statuses(&mut tx, owner_id, date).await?;
        tx.commit().await?;
        Ok(buckets)
    }

    pub async fn pending_days(
        &self,
        owner_id: i64,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> BillingResult<Vec<NaiveDate>> {
        let mut tx = self.pool.begin().await?;
        let days = resolver::pending_days(&mut tx, owner_id, year, month, today).await?;
        tx.commit().await?;
        Ok(days)
    }

    pub async fn collection_summary(
        &self,
        owner_id: i64,
        query: CollectionQuery,
    ) -> BillingResult<CollectionTotals> {
        let mut conn = self.pool.acquire().await?;
        aggregator::collection_summary(&mut conn, owner_id, query).await
    }

    /// Totals summed from raw ledger rows
    pub async fn ledger_summary(
        &self,
        owner_id: i64,
        query: CollectionQuery,
    ) -> BillingResult<CollectionTotals> {
        let mut conn = self.pool.acquire().await?;
        aggregator::ledger_summary(&mut conn, owner_id, query).await
    }

    pub async fn collection_counts(&self, owner_id: i64, date: NaiveDate) -> BillingResult<CollectionCounts> {
        let mut conn = self.pool.acquire().await?;
        aggregator::collection_counts(&mut conn, owner_id, date).await
    }

    /// Rebuild one day's rollup from the ledger
    pub async fn reconcile(&self, owner_id: i64, date: NaiveDate) -> BillingResult<CollectionTotals> {
        let (previous, repaired) = self
            .retrying("reconcile", || async move {
                let mut tx = self.pool.begin().await?;
                let result = aggregator::reconcile(&mut tx, owner_id, date).await?;
                tx.commit().await?;
                Ok(result)
            })
            .await?;

        if previous != repaired {
            tracing::warn!(
                owner_id,
                date = %date,
                cached_cash = %previous.total_cash,
                cached_online = %previous.total_online,
                cash = %repaired.total_cash,
                online = %repaired.total_online,
                "Collection rollup drift repaired"
            );
        }
        Ok(repaired)
    }

    /// Members whose next due date is `today`
    pub async fn due_today(&self, owner_id: i64, today: NaiveDate) -> BillingResult<Vec<Member>> {
        let mut conn = self.pool.acquire().await?;
        Ok(member_repo::find_due_on(&mut conn, owner_id, today).await?)
    }
}

/// Validated registration input shared by every retry attempt
struct Registration<'a> {
    name: &'a str,
    mobile_no: Option<&'a str>,
    admission_date: NaiveDate,
    /// (fee cents, months) of a custom plan
    plan: Option<(i64, u32)>,
    admission_fee_cents: i64,
    channel: PaymentChannel,
}

fn ensure_not_before_admission(member: &Member, date: NaiveDate) -> BillingResult<()> {
    if date < member.admission_date {
        return Err(BillingError::InvalidDate(format!(
            "{date} is before the admission date {}",
            member.admission_date
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn new_member(name: &str, admitted: NaiveDate) -> MemberCreate {
        MemberCreate {
            name: name.to_string(),
            admission_date: admitted,
            mobile_no: None,
            fee_amount: None,
            plan_duration_months: None,
            admission_fee: None,
            channel: PaymentChannel::Cash,
        }
    }

    async fn service() -> BillingService {
        BillingService::new(test_pool().await, DEFAULT_RETRY_LIMIT)
    }

    #[tokio::test]
    async fn test_register_standard_member() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();

        let member = svc
            .register_member(owner.id, new_member("  Asha  ", d(2024, 1, 31)))
            .await
            .unwrap();
        assert_eq!(member.name, "Asha");
        assert!(!member.is_special);
        assert_eq!(member.plan_duration_months, 1);
        assert_eq!(member.next_due_date, Some(d(2024, 2, 29)));

        // nothing recorded without an admission fee
        let flags = svc.lookup_status(owner.id, member.id, d(2024, 1, 31)).await.unwrap();
        assert!(flags.is_none());
    }

    #[tokio::test]
    async fn test_register_special_member_prepays_plan() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();

        let mut data = new_member("Bala", d(2024, 1, 15));
        data.fee_amount = Some(dec!(450));
        data.plan_duration_months = Some(3);
        data.admission_fee = Some(dec!(100));
        data.channel = PaymentChannel::Online;
        let member = svc.register_member(owner.id, data).await.unwrap();

        assert!(member.is_special);
        assert_eq!(member.fee_amount, Some(dec!(450)));
        assert_eq!(member.next_due_date, Some(d(2024, 4, 15)));

        let day = |date| CollectionQuery::Day { date };
        let first = svc.collection_summary(owner.id, day(d(2024, 1, 15))).await.unwrap();
        assert_eq!(first.total_online, dec!(550));
        let third = svc.collection_summary(owner.id, day(d(2024, 3, 15))).await.unwrap();
        assert_eq!(third.total_online, dec!(450));
        assert!(
            svc.lookup_status(owner.id, member.id, d(2024, 4, 15))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();

        let err = svc.register_member(owner.id, new_member("   ", d(2024, 1, 15))).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput { .. }));

        let mut half_plan = new_member("Asha", d(2024, 1, 15));
        half_plan.fee_amount = Some(dec!(300));
        assert!(svc.register_member(owner.id, half_plan).await.is_err());

        let mut zero_months = new_member("Asha", d(2024, 1, 15));
        zero_months.fee_amount = Some(dec!(300));
        zero_months.plan_duration_months = Some(0);
        let err = svc.register_member(owner.id, zero_months).await.unwrap_err();
        assert_eq!(err.code(), shared::error::ErrorCode::InvalidPlanDuration);

        svc.register_member(owner.id, new_member("Asha", d(2024, 1, 15))).await.unwrap();
        let err = svc.register_member(owner.id, new_member("ASHA", d(2024, 2, 1))).await.unwrap_err();
        assert_eq!(err.code(), shared::error::ErrorCode::MemberNameExists);

        let err = svc.register_member(999, new_member("Dev", d(2024, 1, 15))).await.unwrap_err();
        assert_eq!(err.code(), shared::error::ErrorCode::TenantNotFound);
    }

    #[tokio::test]
    async fn test_pay_months_uses_member_then_owner_fee() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();
        let member = svc
            .register_member(owner.id, new_member("Asha", d(2024, 1, 15)))
            .await
            .unwrap();

        let receipt = svc
            .pay_months(owner.id, member.id, d(2024, 2, 15), PaymentChannel::Cash, None)
            .await
            .unwrap();
        assert_eq!(receipt.dates, vec![d(2024, 2, 15)]);
        assert_eq!(receipt.amount_per_month, dec!(500));
        assert_eq!(receipt.next_due_date, d(2024, 3, 15));

        let receipt = svc
            .pay_months(
                owner.id,
                member.id,
                d(2024, 3, 15),
                PaymentChannel::Online,
                Some(PlanOverride {
                    fee_amount: dec!(400),
                    plan_duration_months: 2,
                }),
            )
            .await
            .unwrap();
        assert_eq!(receipt.total(), dec!(800));

        let member = svc.get_member(owner.id, member.id).await.unwrap();
        assert!(member.is_special);
        assert_eq!(member.plan_duration_months, 2);
        assert_eq!(member.next_due_date, Some(d(2024, 5, 15)));

        // later payments keep the custom plan even after the default changes
        svc.set_default_fee(owner.id, dec!(700)).await.unwrap();
        let receipt = svc
            .pay_months(owner.id, member.id, d(2024, 5, 15), PaymentChannel::Cash, None)
            .await
            .unwrap();
        assert_eq!(receipt.amount_per_month, dec!(400));
        assert_eq!(receipt.dates.len(), 2);
    }

    #[tokio::test]
    async fn test_month_end_next_due_matches_schedule_rule() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();
        let admitted = d(2024, 1, 31);
        let member = svc
            .register_member(owner.id, new_member("Asha", admitted))
            .await
            .unwrap();
        assert_eq!(
            member.next_due_date,
            Some(compute_next_due_date(admitted, admitted).unwrap())
        );

        let receipt = svc
            .pay_months(
                owner.id,
                member.id,
                admitted,
                PaymentChannel::Cash,
                Some(PlanOverride {
                    fee_amount: dec!(400),
                    plan_duration_months: 2,
                }),
            )
            .await
            .unwrap();
        assert_eq!(receipt.dates, vec![d(2024, 1, 31), d(2024, 2, 29)]);
        let last = *receipt.dates.last().unwrap();
        assert_eq!(receipt.next_due_date, compute_next_due_date(admitted, last).unwrap());
        assert_eq!(receipt.next_due_date, d(2024, 3, 31));

        let stored = svc.get_member(owner.id, member.id).await.unwrap();
        assert_eq!(stored.next_due_date, Some(receipt.next_due_date));
    }

    #[tokio::test]
    async fn test_pay_before_admission_is_rejected() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();
        let member = svc
            .register_member(owner.id, new_member("Asha", d(2024, 1, 15)))
            .await
            .unwrap();

        let err = svc
            .pay_months(owner.id, member.id, d(2023, 12, 15), PaymentChannel::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidDate(_)));

        let err = svc
            .record_payment(owner.id, member.id, d(2024, 1, 1), PaymentChannel::Cash, dec!(500))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidDate(_)));
    }

    #[tokio::test]
    async fn test_mark_status_and_amount_validation() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();
        let member = svc
            .register_member(owner.id, new_member("Asha", d(2024, 1, 15)))
            .await
            .unwrap();
        let date = d(2024, 2, 15);

        let entry = svc
            .mark_status(owner.id, member.id, date, EntryStatus::Cash(dec!(499.995)))
            .await
            .unwrap();
        assert_eq!(entry.amount_paid, dec!(500.00));

        let entry = svc
            .mark_status(owner.id, member.id, date, EntryStatus::Pending)
            .await
            .unwrap();
        assert!(!entry.cash && !entry.online && !entry.suspend);
        let totals = svc
            .collection_summary(owner.id, CollectionQuery::Day { date })
            .await
            .unwrap();
        assert_eq!(totals.total(), dec!(0));

        let err = svc
            .record_payment(owner.id, member.id, date, PaymentChannel::Cash, dec!(-1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), shared::error::ErrorCode::PaymentInvalidAmount);
    }

    #[tokio::test]
    async fn test_search_and_list() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();
        for name in ["zara", "Asha", "bala_k"] {
            svc.register_member(owner.id, new_member(name, d(2024, 1, 15)))
                .await
                .unwrap();
        }

        let found = svc.search_members(owner.id, " A ").await.unwrap();
        let names: Vec<_> = found.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "bala_k", "zara"]);

        let found = svc.search_members(owner.id, "_").await.unwrap();
        assert_eq!(found.len(), 1);

        assert!(svc.search_members(owner.id, "  ").await.is_err());

        let listed = svc.list_members(owner.id).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|m| !m.is_suspended));
        assert_eq!(
            svc.members_admitted_on(owner.id, d(2024, 1, 15)).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_update_member() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();
        let asha = svc
            .register_member(owner.id, new_member("Asha", d(2024, 1, 15)))
            .await
            .unwrap();
        svc.register_member(owner.id, new_member("Bala", d(2024, 1, 15)))
            .await
            .unwrap();

        let updated = svc
            .update_member(
                owner.id,
                asha.id,
                MemberUpdate {
                    name: None,
                    mobile_no: Some(" 98450 ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Asha");
        assert_eq!(updated.mobile_no.as_deref(), Some("98450"));

        let err = svc
            .update_member(
                owner.id,
                asha.id,
                MemberUpdate {
                    name: Some("bala".into()),
                    mobile_no: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), shared::error::ErrorCode::MemberNameExists);

        let err = svc
            .update_member(owner.id, 12345, MemberUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), shared::error::ErrorCode::MemberNotFound);
    }

    #[tokio::test]
    async fn test_owner_settings() {
        let svc = service().await;
        let owner = svc.create_owner("Iron Gym", dec!(500)).await.unwrap();
        assert!(!owner.reminders_active);

        svc.set_reminders_active(owner.id, true).await.unwrap();
        svc.set_default_fee(owner.id, dec!(650.5)).await.unwrap();
        let owner = svc.get_owner(owner.id).await.unwrap();
        assert!(owner.reminders_active);
        assert_eq!(owner.default_fee, dec!(650.50));
        assert_eq!(svc.owners_with_reminders().await.unwrap().len(), 1);

        assert!(svc.set_default_fee(owner.id, dec!(-5)).await.is_err());
        let err = svc.set_reminders_active(42, true).await.unwrap_err();
        assert_eq!(err.code(), shared::error::ErrorCode::TenantNotFound);
    }

    #[tokio::test]
    async fn test_retrying_replays_conflicts_only() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let svc = BillingService::new(test_pool().await, 2);
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: BillingResult<()> = svc
            .retrying("test", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BillingError::ConflictAborted("busy".into()))
            })
            .await;
        assert!(matches!(result, Err(BillingError::ConflictAborted(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: BillingResult<()> = svc
            .retrying("test", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BillingError::invalid("bad"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Member Model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ledger::PaymentChannel;

/// Member entity (会员)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub admission_date: NaiveDate,
    pub mobile_no: Option<String>,
    /// Once set, never cleared
    pub is_special: bool,
    /// None = owner default fee
    pub fee_amount: Option<Decimal>,
    pub plan_duration_months: u32,
    /// Cached; rewritten by every payment action
    pub next_due_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Register member payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberCreate {
    pub name: String,
    pub admission_date: NaiveDate,
    pub mobile_no: Option<String>,
    /// Custom monthly fee; together with `plan_duration_months` makes a special member
    pub fee_amount: Option<Decimal>,
    pub plan_duration_months: Option<u32>,
    /// One-time admission fee, recorded on the admission-date entry
    pub admission_fee: Option<Decimal>,
    /// Channel for the admission fee and any prepaid months
    pub channel: PaymentChannel,
}

/// Update member payload (profile fields only)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub mobile_no: Option<String>,
}

/// Member plus whether any ledger entry currently suspends them (list view)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberWithSuspension {
    #[serde(flatten)]
    pub member: Member,
    pub is_suspended: bool,
}

/// Plan override supplied with a payment action
///
/// Marks the member special and replaces fee and duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOverride {
    pub fee_amount: Decimal,
    pub plan_duration_months: u32,
}

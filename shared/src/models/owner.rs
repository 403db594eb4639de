//! Owner Model (商户 / 租户计费设置)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Owner billing settings
///
/// The owner identity itself is issued by the external identity service;
/// this row only carries what billing needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub business_name: String,
    /// Monthly fee charged to members without a custom plan
    pub default_fee: Decimal,
    /// Whether the daily due sweep collects reminders for this owner
    pub reminders_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

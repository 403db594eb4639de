//! Payment Ledger Models (缴费台账)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Payment channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChannel {
    Cash,
    Online,
}

impl PaymentChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Online => "online",
        }
    }
}

impl fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown payment channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for PaymentChannel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "online" => Ok(Self::Online),
            _ => Err(UnknownChannel(s.to_string())),
        }
    }
}

/// Status flags of one ledger row
///
/// A missing row and a row with every flag false both mean pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct EntryFlags {
    pub cash: bool,
    pub online: bool,
    pub suspend: bool,
}

/// Ledger entry: what happened for one member on one billing date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub owner_id: i64,
    pub member_id: i64,
    pub billing_date: NaiveDate,
    pub cash: bool,
    pub online: bool,
    pub suspend: bool,
    pub amount_paid: Decimal,
    /// One-time admission fee portion of `amount_paid`
    pub amount_for_new: Decimal,
    pub updated_at: i64,
}

impl LedgerEntry {
    pub fn flags(&self) -> EntryFlags {
        EntryFlags {
            cash: self.cash,
            online: self.online,
            suspend: self.suspend,
        }
    }
}

/// Target state for an explicit single-date status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "amount", rename_all = "lowercase")]
pub enum EntryStatus {
    /// Tracked but unresolved
    Pending,
    Cash(Decimal),
    Online(Decimal),
    Suspended,
}

/// Outcome of a multi-month payment action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub member_id: i64,
    pub channel: PaymentChannel,
    /// Billing dates covered, ascending
    pub dates: Vec<NaiveDate>,
    pub amount_per_month: Decimal,
    pub next_due_date: NaiveDate,
}

impl PaymentReceipt {
    pub fn total(&self) -> Decimal {
        self.amount_per_month * Decimal::from(self.dates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parse() {
        assert_eq!("cash".parse::<PaymentChannel>(), Ok(PaymentChannel::Cash));
        assert_eq!(" Online ".parse::<PaymentChannel>(), Ok(PaymentChannel::Online));
        assert_eq!(
            "cheque".parse::<PaymentChannel>(),
            Err(UnknownChannel("cheque".to_string()))
        );
    }

    #[test]
    fn test_entry_status_serialize() {
        let json = serde_json::to_string(&EntryStatus::Suspended).unwrap();
        assert_eq!(json, r#"{"status":"suspended"}"#);

        let status: EntryStatus =
            serde_json::from_str(r#"{"status":"cash","amount":"500"}"#).unwrap();
        assert_eq!(status, EntryStatus::Cash(Decimal::new(500, 0)));
    }
}

//! Collection rollup models (日收款汇总)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Collected totals split by channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTotals {
    pub total_cash: Decimal,
    pub total_online: Decimal,
}

impl CollectionTotals {
    pub fn total(&self) -> Decimal {
        self.total_cash + self.total_online
    }
}

impl Add for CollectionTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total_cash: self.total_cash + rhs.total_cash,
            total_online: self.total_online + rhs.total_online,
        }
    }
}

/// Number of paid entries per channel on one date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CollectionCounts {
    pub cash: i64,
    pub online: i64,
}

/// Period selector for collection summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CollectionQuery {
    Day { date: NaiveDate },
    /// Inclusive on both ends
    Range { from: NaiveDate, to: NaiveDate },
}

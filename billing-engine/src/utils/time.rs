//! 时间工具函数 — 业务时区与日历边界

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::billing::error::{BillingError, BillingResult};

/// 某月的第一天和最后一天
pub fn month_bounds(year: i32, month: u32) -> BillingResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| BillingError::InvalidDate(format!("{year}-{month:02}")))?;
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .ok_or_else(|| BillingError::InvalidDate(format!("{year}-{month:02}")))?;
    let last = next
        .pred_opt()
        .ok_or_else(|| BillingError::InvalidDate(format!("{year}-{month:02}")))?;
    Ok((first, last))
}

/// 解析 IANA 时区名
pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| format!("Invalid timezone '{name}': {e}"))
}

//! Billing schedule calculator
//!
//! Pure date arithmetic, no I/O. Month arithmetic clamps to the last day of
//! a shorter month: a member admitted on the 31st is due on Feb 28/29,
//! Apr 30 and so on, and never twice in the same month.

use chrono::{Datelike, Months, NaiveDate};

use super::error::{BillingError, BillingResult};

/// Upper bound for a prepaid plan (ten years)
pub const MAX_PLAN_MONTHS: u32 = 120;

/// Whether `date` is the last day of its month
pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().is_none_or(|next| next.month() != date.month())
}

/// Number of days in the month containing `date`
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(31, |last| last.day())
}

/// Anniversary rule: is `target` a billing day for a member admitted on `admission`?
///
/// Same day of month, or `target` is a month end that the admission day
/// does not fit into.
pub fn is_billing_day(admission: NaiveDate, target: NaiveDate) -> bool {
    if target < admission {
        return false;
    }
    target.day() == admission.day()
        || (is_last_day_of_month(target) && admission.day() >= target.day())
}

/// Validate a plan duration
pub fn validate_months(months: u32) -> BillingResult<()> {
    if months < 1 {
        return Err(BillingError::invalid_plan(format!(
            "plan duration must be at least 1 month, got {months}"
        )));
    }
    if months > MAX_PLAN_MONTHS {
        return Err(BillingError::invalid_plan(format!(
            "plan duration exceeds maximum allowed ({MAX_PLAN_MONTHS}), got {months}"
        )));
    }
    Ok(())
}

/// Ordered due dates of one plan
///
/// Yields `months` dates; the first is the start date, the i-th falls in the
/// month `start + i` on the anchor day, clamped to the month length. Cloning
/// restarts the sequence.
#[derive(Debug, Clone)]
pub struct DueSchedule {
    start: NaiveDate,
    first_of_month: NaiveDate,
    anchor_day: u32,
    months: u32,
    next: u32,
}

impl DueSchedule {
    /// Date at position `index` (0 = start); `index == months` is the due date after the plan
    pub fn date_at(&self, index: u32) -> Option<NaiveDate> {
        if index == 0 {
            return Some(self.start);
        }
        let month = self.first_of_month.checked_add_months(Months::new(index))?;
        month.with_day(self.anchor_day.min(days_in_month(month)))
    }

    /// Date at position `months`, one step past the plan
    fn following(&self) -> Option<NaiveDate> {
        self.date_at(self.months)
    }

    pub fn months(&self) -> u32 {
        self.months
    }
}

impl Iterator for DueSchedule {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.next >= self.months {
            return None;
        }
        let date = self.date_at(self.next)?;
        self.next += 1;
        Some(date)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.months - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for DueSchedule {}

/// Compute the due dates of a plan of `months` months starting at `start`
///
/// When `start` is itself a billing day of `admission`, later dates stay on
/// the admission anniversary (so a Feb 29 start for a 31st admission
/// continues on Mar 31). Otherwise they follow the start day.
pub fn compute_due_dates(
    admission: NaiveDate,
    months: u32,
    start: NaiveDate,
) -> BillingResult<DueSchedule> {
    validate_months(months)?;

    let anchor_day = if is_billing_day(admission, start) {
        admission.day()
    } else {
        start.day()
    };
    let first_of_month = start.with_day(1).ok_or_else(|| {
        BillingError::InvalidDate(format!("cannot take the first of month of {start}"))
    })?;

    let schedule = DueSchedule {
        start,
        first_of_month,
        anchor_day,
        months,
        next: 0,
    };
    // Reject schedules that run past the calendar range up front so iteration never stops early
    if schedule.following().is_none() {
        return Err(BillingError::InvalidDate(format!(
            "{months} months from {start} is out of range"
        )));
    }
    Ok(schedule)
}

/// The due date after `last_payment`
///
/// One month later under the same anchor rule as [`compute_due_dates`]:
/// a payment on a billing day moves on to the next admission anniversary,
/// any other payment date moves on to the same day next month.
pub fn compute_next_due_date(
    admission: NaiveDate,
    last_payment: NaiveDate,
) -> BillingResult<NaiveDate> {
    compute_due_dates(admission, 1, last_payment)?
        .following()
        .ok_or_else(|| BillingError::InvalidDate(format!("{last_payment} + 1 month is out of range")))
}

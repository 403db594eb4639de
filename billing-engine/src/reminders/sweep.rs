//! Daily due sweep
//!
//! Once a day at the configured local hour, collect the members due today for
//! every owner with reminders switched on and hand each batch to the sink.
//! Read only: the sweep never writes the ledger.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use super::sink::ReminderSink;
use crate::billing::{BillingResult, BillingService};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub date: Option<NaiveDate>,
    /// Owners with reminders switched on
    pub owners: usize,
    pub members_due: usize,
    /// Owners whose batch could not be read or delivered
    pub failures: usize,
}

/// Next sweep instant strictly after `now`: today at `hour` local time, else tomorrow
///
/// A local time skipped by a DST jump falls back to the same wall clock in UTC.
pub fn next_run_after(now: DateTime<Utc>, tz: Tz, hour: u32) -> DateTime<Utc> {
    let local_today = now.with_timezone(&tz).date_naive();
    let at = |date: NaiveDate| -> Option<DateTime<Utc>> {
        let naive = date.and_hms_opt(hour.min(23), 0, 0)?;
        Some(
            naive
                .and_local_timezone(tz)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc()),
        )
    };

    match at(local_today) {
        Some(today_run) if today_run > now => today_run,
        _ => local_today
            .succ_opt()
            .and_then(at)
            .unwrap_or(now + chrono::Duration::days(1)),
    }
}

pub struct DueSweep {
    billing: BillingService,
    sink: Arc<dyn ReminderSink>,
    tz: Tz,
    hour: u32,
}

impl DueSweep {
    pub fn new(billing: BillingService, sink: Arc<dyn ReminderSink>, tz: Tz, hour: u32) -> Self {
        Self {
            billing,
            sink,
            tz,
            hour,
        }
    }

    /// Sweep once for `today`
    ///
    /// A failing owner is logged and counted; the remaining owners still run.
    pub async fn run_once(&self, today: NaiveDate) -> BillingResult<SweepReport> {
        let owners = self.billing.owners_with_reminders().await?;
        let mut report = SweepReport {
            date: Some(today),
            owners: owners.len(),
            ..Default::default()
        };

        for owner in &owners {
            let due = match self.billing.due_today(owner.id, today).await {
                Ok(due) => due,
                Err(e) => {
                    tracing::error!(owner_id = owner.id, error = %e, "Failed to read due members");
                    report.failures += 1;
                    continue;
                }
            };
            if due.is_empty() {
                continue;
            }
            report.members_due += due.len();
            if let Err(e) = self.sink.deliver(owner, &due).await {
                tracing::error!(owner_id = owner.id, error = %e, "Reminder delivery failed");
                report.failures += 1;
            }
        }

        tracing::info!(
            date = %today,
            owners = report.owners,
            members_due = report.members_due,
            failures = report.failures,
            "Due sweep finished"
        );
        Ok(report)
    }

    /// Run until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(timezone = %self.tz, hour = self.hour, "Due sweep scheduled");
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.tz, self.hour);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_run = %next, "Waiting for next due sweep");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Due sweep stopped");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            let today = next.with_timezone(&self.tz).date_naive();
            if let Err(e) = self.run_once(today).await {
                tracing::error!(date = %today, error = %e, "Due sweep failed");
            }
        }
    }
}

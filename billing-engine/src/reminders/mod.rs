//! 到期提醒 - 每日扫描当天到期的会员

pub mod sink;
pub mod sweep;

pub use sink::{LoggingSink, ReminderSink};
pub use sweep::{DueSweep, SweepReport, next_run_after};

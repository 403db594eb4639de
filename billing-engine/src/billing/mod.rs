//! 计费核心
//!
//! - [`schedule`] - 账期计算 (纯函数)
//! - [`ledger`] - 缴费台账写入 + 日汇总增量
//! - [`resolver`] - 某日会员状态分类
//! - [`aggregator`] - 收款汇总读取与对账
//! - [`service`] - 事务边界与冲突重试

pub mod aggregator;
pub mod error;
pub mod ledger;
pub mod money;
pub mod resolver;
pub mod schedule;
pub mod service;

pub use error::{BillingError, BillingResult, Entity};
pub use resolver::ResolvedStatus;
pub use schedule::{DueSchedule, compute_due_dates, compute_next_due_date, is_billing_day};
pub use service::{BillingService, DEFAULT_RETRY_LIMIT};

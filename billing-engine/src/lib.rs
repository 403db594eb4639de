//! Billing Engine - 会员月费计费与缴费状态引擎
//!
//! # 架构概述
//!
//! - **账期计算** (`billing::schedule`): 入会周年日规则，月末自动收敛
//! - **缴费台账** (`billing::ledger`): 每会员每账期一行，读-改-写 + 日汇总增量
//! - **状态分类** (`billing::resolver`): 待缴 / 已缴 (现金/线上) / 暂停
//! - **收款汇总** (`billing::aggregator`): 日汇总缓存读取与对账
//! - **到期提醒** (`reminders`): 每日到期扫描
//!
//! # 模块结构
//!
//! ```text
//! billing-engine/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── billing/       # 计费核心与服务门面
//! ├── db/            # SQLite 连接池与 repository
//! ├── reminders/     # 到期扫描与提醒出口
//! └── utils/         # 日志、时间、输入校验
//! ```

pub mod billing;
pub mod core;
pub mod db;
pub mod reminders;
pub mod utils;

// Re-export 公共类型
pub use billing::{BillingError, BillingResult, BillingService};
pub use core::{BackgroundTasks, BillingState, Config};
pub use db::DbService;
pub use reminders::{DueSweep, LoggingSink, ReminderSink};

// Re-export unified error types from shared
pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env、读取配置、初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    // .env 可选
    let _ = dotenv::dotenv();

    let config = Config::from_env()?;
    init_logger_with_file(
        &config.log_level,
        config.json_logs(),
        config.log_dir.as_deref(),
    )?;
    Ok(config)
}

use std::sync::Arc;

use shared::error::AppError;

use crate::billing::BillingService;
use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::DbService;
use crate::reminders::{DueSweep, ReminderSink};
use crate::utils::logger::run_log_cleanup;

/// 引擎状态 - 持有所有服务的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | SQLite 连接池 |
/// | billing | BillingService | 计费服务 |
#[derive(Clone)]
pub struct BillingState {
    pub config: Config,
    pub db: DbService,
    pub billing: BillingService,
}

impl BillingState {
    /// 初始化: 工作目录 → 数据库 (含迁移) → 服务
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.work_dir)
            .map_err(|e| AppError::config(format!("Failed to create work dir: {e}")))?;
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::config(format!("Failed to create database dir: {e}")))?;
        }

        let db_path = config.database_path.to_string_lossy();
        let db = DbService::new(&db_path, config.max_db_connections).await?;
        let billing = BillingService::new(db.pool.clone(), config.write_retry_limit);

        tracing::info!(
            environment = %config.environment,
            timezone = %config.timezone,
            retry_limit = config.write_retry_limit,
            "Billing engine initialized"
        );
        Ok(Self {
            config: config.clone(),
            db,
            billing,
        })
    }

    /// 启动后台任务: 每日到期扫描，配置了日志目录时再加日志清理
    pub fn start_background_tasks(&self, sink: Arc<dyn ReminderSink>) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let sweep = DueSweep::new(
            self.billing.clone(),
            sink,
            self.config.timezone,
            self.config.sweep_hour,
        );
        tasks.spawn("due_sweep", TaskKind::Periodic, sweep.run(tasks.shutdown_token()));

        if let Some(dir) = self.config.log_dir.clone() {
            tasks.spawn(
                "log_cleanup",
                TaskKind::Periodic,
                run_log_cleanup(dir, tasks.shutdown_token()),
            );
        }

        tasks.log_summary();
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::LoggingSink;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_initialize_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().join("work");
        let config = Config::from_lookup(|key| match key {
            "WORK_DIR" => Some(work_dir.to_string_lossy().into_owned()),
            _ => None,
        })
        .unwrap();

        let state = BillingState::initialize(&config).await.unwrap();
        assert!(work_dir.join("billing.db").exists());

        let owner = state.billing.create_owner("Iron Gym", dec!(500)).await.unwrap();
        assert_eq!(state.billing.get_owner(owner.id).await.unwrap().business_name, "Iron Gym");

        let tasks = state.start_background_tasks(Arc::new(LoggingSink));
        assert_eq!(tasks.len(), 1);
        tasks.shutdown().await;
    }
}

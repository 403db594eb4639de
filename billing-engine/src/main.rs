use std::sync::Arc;

use billing_engine::{BillingState, LoggingSink, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 配置, 日志)
    let config = setup_environment()?;

    tracing::info!(
        database = %config.database_path.display(),
        "Billing engine starting..."
    );

    // 2. 初始化引擎状态 (数据库 + 迁移 + 服务)
    let state = BillingState::initialize(&config).await?;

    // 3. 启动后台任务 (到期扫描、日志清理)
    let tasks = state.start_background_tasks(Arc::new(LoggingSink));

    // 4. 等待退出信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    state.db.pool.close().await;
    tracing::info!("Billing engine stopped");
    Ok(())
}

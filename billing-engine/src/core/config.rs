use std::path::PathBuf;

use chrono_tz::Tz;
use shared::error::{AppError, ErrorCode};

use crate::billing::DEFAULT_RETRY_LIMIT;
use crate::utils::time::parse_timezone;

/// 计费引擎配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./work_dir | 工作目录 |
/// | DATABASE_PATH | {WORK_DIR}/billing.db | SQLite 数据库文件 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志目录，不设置则只输出到控制台 |
/// | BUSINESS_TIMEZONE | Asia/Kolkata | 业务时区，决定"今天" |
/// | SWEEP_HOUR | 7 | 每日到期扫描的本地小时 (0-23) |
/// | MAX_DB_CONNECTIONS | 5 | 连接池大小 |
/// | WRITE_RETRY_LIMIT | 3 | 写冲突重试次数 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/billing BUSINESS_TIMEZONE=Asia/Kolkata cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: PathBuf,
    pub database_path: PathBuf,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub timezone: Tz,
    pub sweep_hour: u32,
    pub max_db_connections: u32,
    pub write_retry_limit: u32,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    ///
    /// 数值解析失败时记录警告并回退默认值；时区无效直接报错。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str, default: u32| -> u32 {
            match get(key) {
                None => default,
                Some(raw) => raw.parse().unwrap_or_else(|_| {
                    tracing::warn!(key, value = %raw, default, "Invalid number, using default");
                    default
                }),
            }
        };

        let work_dir = PathBuf::from(get("WORK_DIR").unwrap_or_else(|| "./work_dir".into()));
        let database_path = get("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| work_dir.join("billing.db"));

        let timezone = match get("BUSINESS_TIMEZONE") {
            Some(name) => parse_timezone(&name)
                .map_err(|e| AppError::with_message(ErrorCode::ConfigError, e))?,
            None => chrono_tz::Asia::Kolkata,
        };

        let mut sweep_hour = number("SWEEP_HOUR", 7);
        if sweep_hour > 23 {
            tracing::warn!(sweep_hour, "SWEEP_HOUR out of range, using 7");
            sweep_hour = 7;
        }

        Ok(Self {
            database_path,
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: get("LOG_DIR").map(PathBuf::from),
            timezone,
            sweep_hour,
            max_db_connections: number("MAX_DB_CONNECTIONS", 5).max(1),
            write_retry_limit: number("WRITE_RETRY_LIMIT", DEFAULT_RETRY_LIMIT),
            work_dir,
        })
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// JSON 日志用于非开发环境
    pub fn json_logs(&self) -> bool {
        !self.is_development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("./work_dir"));
        assert_eq!(config.database_path, PathBuf::from("./work_dir/billing.db"));
        assert_eq!(config.timezone, chrono_tz::Asia::Kolkata);
        assert_eq!(config.sweep_hour, 7);
        assert_eq!(config.max_db_connections, 5);
        assert_eq!(config.write_retry_limit, 3);
        assert!(config.is_development());
        assert!(!config.json_logs());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = config(&[
            ("WORK_DIR", "/data/billing"),
            ("ENVIRONMENT", "production"),
            ("BUSINESS_TIMEZONE", "Europe/Madrid"),
            ("SWEEP_HOUR", "25"),
            ("MAX_DB_CONNECTIONS", "lots"),
            ("WRITE_RETRY_LIMIT", "5"),
            ("LOG_DIR", "  "),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/data/billing/billing.db"));
        assert_eq!(config.timezone, chrono_tz::Europe::Madrid);
        assert_eq!(config.sweep_hour, 7);
        assert_eq!(config.max_db_connections, 5);
        assert_eq!(config.write_retry_limit, 5);
        assert!(config.is_production());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_invalid_timezone_is_an_error() {
        let err = config(&[("BUSINESS_TIMEZONE", "Nowhere/Land")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}

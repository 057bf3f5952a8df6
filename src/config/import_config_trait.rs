// ==========================================
// 物料申请系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入/修正模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::settings::{ImportSettings, SuspicionThresholds};
use async_trait::async_trait;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置读取失败: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv 表）/ DefaultConfig（内置默认值）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 导入参数（行数上限、表头行数、物料编码长度、窗口、保留天数）
    async fn get_import_settings(&self) -> ConfigResult<ImportSettings>;

    /// 可疑数量阈值与修正取整方式
    async fn get_suspicion_thresholds(&self) -> ConfigResult<SuspicionThresholds>;
}

/// 内置默认配置（无数据库时使用）
#[derive(Debug, Clone, Default)]
pub struct DefaultConfig;

#[async_trait]
impl ImportConfigReader for DefaultConfig {
    async fn get_import_settings(&self) -> ConfigResult<ImportSettings> {
        Ok(ImportSettings::default())
    }

    async fn get_suspicion_thresholds(&self) -> ConfigResult<SuspicionThresholds> {
        Ok(SuspicionThresholds::default())
    }
}

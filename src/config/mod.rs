// ==========================================
// 物料申请系统 - 配置层
// ==========================================
// 职责: 导入参数与启发式阈值
// 存储: config_kv 表，缺失时使用内置默认值
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod settings;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ConfigError, ConfigResult, DefaultConfig, ImportConfigReader};
pub use settings::{CorrectionRounding, ImportSettings, SuspicionThresholds};

// ==========================================
// 物料申请系统 - 应用状态
// ==========================================
// 职责: 管理共享连接和服务实例
// ==========================================

use std::sync::Arc;

use crate::config::{ConfigManager, ConfigResult};
use crate::engine::{QuantityCorrectionService, RequestStatusService, RetentionService};
use crate::importer::RequestImporterImpl;
use crate::repository::SqliteRequestRepository;

pub type Importer = RequestImporterImpl<SqliteRequestRepository, ConfigManager>;
pub type CorrectionService = QuantityCorrectionService<SqliteRequestRepository, ConfigManager>;
pub type Retention = RetentionService<SqliteRequestRepository, ConfigManager>;
pub type StatusService = RequestStatusService<SqliteRequestRepository, ConfigManager>;

/// 应用状态
///
/// 所有服务共用同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 申请/批次仓储
    pub repo: Arc<SqliteRequestRepository>,

    /// 表格导入
    pub importer: Arc<Importer>,

    /// 可疑数量扫描与修正
    pub correction_service: Arc<CorrectionService>,

    /// 保留期清理
    pub retention_service: Arc<Retention>,

    /// 状态变更
    pub status_service: Arc<StatusService>,
}

impl AppState {
    /// 打开数据库（不存在则建表）并创建所有服务
    pub fn new(db_path: String) -> anyhow::Result<Self> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let repo = Arc::new(SqliteRequestRepository::open(&db_path)?);
        let config = || -> ConfigResult<ConfigManager> {
            ConfigManager::from_connection(repo.connection())
        };

        let importer = Arc::new(RequestImporterImpl::new(Arc::clone(&repo), config()?));
        let correction_service = Arc::new(QuantityCorrectionService::new(
            Arc::clone(&repo),
            config()?,
        ));
        let retention_service = Arc::new(RetentionService::new(Arc::clone(&repo), config()?));
        let status_service = Arc::new(RequestStatusService::new(Arc::clone(&repo), config()?));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            repo,
            importer,
            correction_service,
            retention_service,
            status_service,
        })
    }

    /// 配置管理器（与服务共享连接，覆写对后续调用立即生效）
    pub fn config_manager(&self) -> ConfigResult<ConfigManager> {
        ConfigManager::from_connection(self.repo.connection())
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - MATERIAL_REQUESTS_DB_PATH 非空时直接使用
/// - 否则: 用户数据目录/material-requests/material_requests.db
/// - 无法获取数据目录时: ./material_requests.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("MATERIAL_REQUESTS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./material_requests.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("material-requests");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "无法创建数据目录，使用当前目录");
        } else {
            path = dir.join("material_requests.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_shares_one_connection() {
        let temp = NamedTempFile::new().unwrap();
        let state = AppState::new(temp.path().to_string_lossy().to_string()).unwrap();

        let manager = state.config_manager().unwrap();
        manager
            .set_global_config_value(crate::config::config_keys::RETENTION_DAYS, "30")
            .unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();
        assert_eq!(
            snapshot.get(crate::config::config_keys::RETENTION_DAYS).map(String::as_str),
            Some("30")
        );

        let other = state.config_manager().unwrap();
        assert_eq!(
            other
                .get_global_config_value(crate::config::config_keys::RETENTION_DAYS)
                .unwrap()
                .as_deref(),
            Some("30")
        );
    }
}

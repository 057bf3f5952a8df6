// ==========================================
// 物料申请系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::config::ConfigError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型（数量修正 / 状态变更 / 清理）
#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("应用修正需要显式确认（confirm = true）")]
    ConfirmationRequired,

    #[error("修正不适用: 数量 {quantity} 修正后为 {suggested}（< 1）")]
    CorrectionNotApplicable { quantity: i64, suggested: i64 },

    #[error("申请不存在或已删除: {0}")]
    RequestNotFound(i64),

    #[error("导入批次不存在: {0}")]
    BatchNotFound(String),

    #[error("持久化失败: {0}")]
    PersistenceFailure(#[from] RepositoryError),

    #[error("配置读取失败: {0}")]
    Config(#[from] ConfigError),
}

/// Result 类型别名
pub type CorrectionResult<T> = Result<T, CorrectionError>;

// ==========================================
// 物料申请系统 - 应用层
// ==========================================
// 职责: 组装共享连接、仓储与服务，供 CLI 调用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};

// ==========================================
// 物料申请系统 - 核心库
// ==========================================
// 职责: 表格导入物料申请 + 可疑数量识别与修正
// 技术栈: Rust + SQLite
// 系统定位: 修正需人工确认后才写库
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 组装仓储与服务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{HistoryAction, RequestStatus, Unit, Urgency};

// 领域实体
pub use domain::{
    CorrectionCandidate, HistoryEntry, ImportBatch, ImportRow, MaterialRequest,
    NewMaterialRequest, RawCell,
};

// 引擎
pub use engine::{QuantityCorrectionService, QuantityHeuristic, RetentionService};

// 导入
pub use importer::{RequestImporter, RequestImporterImpl};

// 应用状态
pub use app::{get_default_db_path, AppState};

// ==========================================
// 系统常量
// ==========================================

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 系统名称
pub const APP_NAME: &str = "Solicitações de Materiais";

// ==========================================
// 物料申请系统 - 引擎层
// ==========================================
// 职责: 可疑数量判定 / 批次扫描修正 / 状态变更 / 保留期清理
// 红线: Engine 不拼 SQL, 所有规则必须输出 reason
// ==========================================

pub mod error;
pub mod quantity_correction;
pub mod retention;
pub mod status_update;
pub mod suspicious_quantity;

// 重导出核心引擎
pub use error::{CorrectionError, CorrectionResult};
pub use quantity_correction::{
    AppliedCorrection, BatchScanSummary, QuantityCorrectionService, ScanFailure, ScanMode,
    ScanReport, ScanScope, SkippedRecord,
};
pub use retention::{PurgeReport, RetentionService};
pub use status_update::{RequestStatusService, StatusChange};
pub use suspicious_quantity::QuantityHeuristic;

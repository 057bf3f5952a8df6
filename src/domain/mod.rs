// ==========================================
// 物料申请系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod correction;
pub mod request;
pub mod types;

// 重导出核心类型
pub use correction::{Confidence, CorrectionCandidate, SuspicionRule};
pub use request::{
    BatchStatus, HistoryEntry, ImportBatch, ImportRow, MaterialRequest, NewMaterialRequest,
    RawCell,
};
pub use types::{HistoryAction, RequestStatus, Unit, Urgency};

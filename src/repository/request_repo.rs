// ==========================================
// 物料申请系统 - 申请与批次 Repository Trait
// ==========================================
// 职责: 定义持久化协作方接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::request::{
    HistoryEntry, ImportBatch, MaterialRequest, NewMaterialRequest,
};
use crate::domain::types::RequestStatus;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

// ==========================================
// RequestRepository Trait
// ==========================================
// 实现者: SqliteRequestRepository（使用 rusqlite）
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// 插入申请，返回自增 id
    async fn insert_request(&self, request: &NewMaterialRequest) -> RepositoryResult<i64>;

    /// 按 id 查询（包含已软删除记录）
    async fn find_request(&self, id: i64) -> RepositoryResult<Option<MaterialRequest>>;

    /// 查询创建时间落在 [start, end] 内、未软删除的申请，按 id 升序
    async fn find_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MaterialRequest>>;

    /// 更新数量
    ///
    /// # 返回
    /// - Err(NotFound): id 不存在
    async fn update_quantity(
        &self,
        id: i64,
        quantity: i64,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    /// 更新状态（任意合法状态均可写入）
    ///
    /// # 返回
    /// - Err(NotFound): id 不存在
    async fn update_status(
        &self,
        id: i64,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    /// 追加历史记录，返回历史 id
    async fn append_history(&self, entry: &HistoryEntry) -> RepositoryResult<i64>;

    /// 查询某申请的历史（按时间升序）
    async fn list_history(&self, request_id: i64) -> RepositoryResult<Vec<HistoryEntry>>;

    /// 软删除创建日期早于 cutoff 的申请，返回受影响 id
    async fn soft_delete_created_before(
        &self,
        cutoff: NaiveDate,
        deleted_at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<i64>>;
}

// ==========================================
// ImportBatchRepository Trait
// ==========================================
#[async_trait]
pub trait ImportBatchRepository: Send + Sync {
    /// 插入批次（status = processing）
    async fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()>;

    /// 批次完成，回写统计与错误明细
    async fn complete_batch(
        &self,
        batch_id: &str,
        success_rows: i64,
        error_rows: i64,
        errors_json: &str,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    /// 按 id 查询批次
    async fn find_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>>;

    /// 全部批次（最新在前）
    async fn list_batches(&self) -> RepositoryResult<Vec<ImportBatch>>;
}

// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、测试数据生成、故障注入仓储
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use material_requests::domain::{
    BatchStatus, HistoryEntry, ImportBatch, MaterialRequest, NewMaterialRequest,
};
use material_requests::repository::{
    ImportBatchRepository, RepositoryError, RepositoryResult, RequestRepository,
    SqliteRequestRepository,
};
use material_requests::{RequestStatus, Unit, Urgency};
use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Arc<SqliteRequestRepository>: 已建表的仓储
pub fn create_test_repo() -> Result<(NamedTempFile, Arc<SqliteRequestRepository>), Box<dyn Error>>
{
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("invalid temp path")?.to_string();
    let repo = SqliteRequestRepository::open(&db_path)?;
    Ok((temp_file, Arc::new(repo)))
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub async fn seed_batch<R: ImportBatchRepository>(repo: &R, batch_id: &str, at: DateTime<Utc>) {
    repo.insert_batch(&ImportBatch {
        batch_id: batch_id.to_string(),
        filename: format!("{}.xlsx", batch_id),
        total_rows: 0,
        success_rows: 0,
        error_rows: 0,
        status: BatchStatus::Completed,
        errors_json: None,
        created_at: at,
        completed_at: Some(at),
    })
    .await
    .unwrap();
}

pub async fn seed_request<R: RequestRepository>(repo: &R, quantity: i64, at: DateTime<Utc>) -> i64 {
    repo.insert_request(&NewMaterialRequest {
        material_code: "1000200030".to_string(),
        material_description: "Chapa galvanizada".to_string(),
        quantity,
        unit: Unit::Kg,
        requester_name: "João".to_string(),
        urgency: Urgency::Normal,
        status: RequestStatus::Pending,
        deadline: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
        justification: None,
        import_batch_id: None,
        created_at: at,
    })
    .await
    .unwrap()
}

// ==========================================
// FlakyRepository - 按条件注入仓储失败
// ==========================================
// - update_quantity: 指定申请 id
// - append_history: 指定申请 id
// - insert_request: 指定物料描述
// - find_created_between: 指定窗口起点
pub struct FlakyRepository {
    inner: Arc<SqliteRequestRepository>,
    failing_updates: HashSet<i64>,
    failing_history: HashSet<i64>,
    failing_inserts: HashSet<String>,
    failing_windows: HashSet<DateTime<Utc>>,
}

fn simulated(what: &str) -> RepositoryError {
    RepositoryError::DatabaseTransactionError(format!("falha simulada: {}", what))
}

impl FlakyRepository {
    pub fn new(inner: Arc<SqliteRequestRepository>) -> Self {
        Self {
            inner,
            failing_updates: HashSet::new(),
            failing_history: HashSet::new(),
            failing_inserts: HashSet::new(),
            failing_windows: HashSet::new(),
        }
    }

    pub fn fail_updates(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.failing_updates.extend(ids);
        self
    }

    pub fn fail_history(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.failing_history.extend(ids);
        self
    }

    pub fn fail_inserts_for(mut self, description: &str) -> Self {
        self.failing_inserts.insert(description.to_string());
        self
    }

    pub fn fail_window_starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.failing_windows.insert(start);
        self
    }
}

#[async_trait]
impl RequestRepository for FlakyRepository {
    async fn insert_request(&self, request: &NewMaterialRequest) -> RepositoryResult<i64> {
        if self.failing_inserts.contains(&request.material_description) {
            return Err(simulated(&request.material_description));
        }
        self.inner.insert_request(request).await
    }

    async fn find_request(&self, id: i64) -> RepositoryResult<Option<MaterialRequest>> {
        self.inner.find_request(id).await
    }

    async fn find_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MaterialRequest>> {
        if self.failing_windows.contains(&start) {
            return Err(simulated(&start.to_string()));
        }
        self.inner.find_created_between(start, end).await
    }

    async fn update_quantity(
        &self,
        id: i64,
        quantity: i64,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        if self.failing_updates.contains(&id) {
            return Err(simulated(&id.to_string()));
        }
        self.inner.update_quantity(id, quantity, updated_at).await
    }

    async fn update_status(
        &self,
        id: i64,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        self.inner.update_status(id, status, updated_at).await
    }

    async fn append_history(&self, entry: &HistoryEntry) -> RepositoryResult<i64> {
        if self.failing_history.contains(&entry.request_id) {
            return Err(simulated(&entry.request_id.to_string()));
        }
        self.inner.append_history(entry).await
    }

    async fn list_history(&self, request_id: i64) -> RepositoryResult<Vec<HistoryEntry>> {
        self.inner.list_history(request_id).await
    }

    async fn soft_delete_created_before(
        &self,
        cutoff: NaiveDate,
        deleted_at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<i64>> {
        self.inner.soft_delete_created_before(cutoff, deleted_at).await
    }
}

#[async_trait]
impl ImportBatchRepository for FlakyRepository {
    async fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        self.inner.insert_batch(batch).await
    }

    async fn complete_batch(
        &self,
        batch_id: &str,
        success_rows: i64,
        error_rows: i64,
        errors_json: &str,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        self.inner
            .complete_batch(batch_id, success_rows, error_rows, errors_json, completed_at)
            .await
    }

    async fn find_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        self.inner.find_batch(batch_id).await
    }

    async fn list_batches(&self) -> RepositoryResult<Vec<ImportBatch>> {
        self.inner.list_batches().await
    }
}

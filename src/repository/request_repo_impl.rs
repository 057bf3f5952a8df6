// ==========================================
// 物料申请系统 - 申请与批次 Repository 实现
// ==========================================
// 职责: 实现申请 / 历史 / 批次的数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{format_timestamp, parse_timestamp};
use crate::domain::request::{
    BatchStatus, HistoryEntry, ImportBatch, MaterialRequest, NewMaterialRequest,
};
use crate::domain::types::RequestStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::request_repo::{ImportBatchRepository, RequestRepository};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";

const REQUEST_COLUMNS: &str = r#"
    id, material_code, material_description, quantidade, unidade,
    requester_name, urgencia, status, deadline, justificativa,
    import_batch_id, created_at, updated_at, deleted_at
"#;

const BATCH_COLUMNS: &str = r#"
    batch_id, filename, total_rows, success_rows, error_rows,
    status, errors_json, created_at, completed_at
"#;

// ==========================================
// 行映射辅助
// ==========================================

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn enum_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(idx, format!("时间戳格式错误: {}", raw)))
}

fn optional_timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("时间戳格式错误: {}", raw))),
    }
}

fn optional_date_column(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|e| conversion_error(idx, e.to_string())),
    }
}

fn map_request_row(row: &Row) -> rusqlite::Result<MaterialRequest> {
    Ok(MaterialRequest {
        id: row.get(0)?,
        material_code: row.get(1)?,
        material_description: row.get(2)?,
        quantity: row.get(3)?,
        unit: enum_column(row, 4)?,
        requester_name: row.get(5)?,
        urgency: enum_column(row, 6)?,
        status: enum_column(row, 7)?,
        deadline: optional_date_column(row, 8)?,
        justification: row.get(9)?,
        import_batch_id: row.get(10)?,
        created_at: timestamp_column(row, 11)?,
        updated_at: timestamp_column(row, 12)?,
        deleted_at: optional_timestamp_column(row, 13)?,
    })
}

fn map_history_row(row: &Row) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: Some(row.get(0)?),
        request_id: row.get(1)?,
        actor: row.get(2)?,
        field_changed: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        action: enum_column(row, 6)?,
        justification: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

fn map_batch_row(row: &Row) -> rusqlite::Result<ImportBatch> {
    let status: String = row.get(5)?;
    Ok(ImportBatch {
        batch_id: row.get(0)?,
        filename: row.get(1)?,
        total_rows: row.get(2)?,
        success_rows: row.get(3)?,
        error_rows: row.get(4)?,
        status: BatchStatus::parse(&status),
        errors_json: row.get(6)?,
        created_at: timestamp_column(row, 7)?,
        completed_at: optional_timestamp_column(row, 8)?,
    })
}

// ==========================================
// SqliteRequestRepository
// ==========================================
pub struct SqliteRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRequestRepository {
    /// 创建新的 Repository 实例（共享连接）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并建表
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 共享连接（供 ConfigManager 等复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl RequestRepository for SqliteRequestRepository {
    async fn insert_request(&self, request: &NewMaterialRequest) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let created_at = format_timestamp(&request.created_at);

        conn.execute(
            r#"
            INSERT INTO material_requests (
                material_code, material_description, quantidade, unidade,
                requester_name, urgencia, status, deadline, justificativa,
                import_batch_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
            params![
                request.material_code,
                request.material_description,
                request.quantity,
                request.unit.as_str(),
                request.requester_name,
                request.urgency.as_str(),
                request.status.as_str(),
                request.deadline.format(DATE_FORMAT).to_string(),
                request.justification,
                request.import_batch_id,
                created_at,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn find_request(&self, id: i64) -> RepositoryResult<Option<MaterialRequest>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM material_requests WHERE id = ?1", REQUEST_COLUMNS);
        let request = conn
            .query_row(&sql, params![id], map_request_row)
            .optional()?;
        Ok(request)
    }

    async fn find_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MaterialRequest>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM material_requests
             WHERE created_at >= ?1 AND created_at <= ?2 AND deleted_at IS NULL
             ORDER BY id",
            REQUEST_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![format_timestamp(&start), format_timestamp(&end)],
            map_request_row,
        )?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }

    async fn update_quantity(
        &self,
        id: i64,
        quantity: i64,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE material_requests SET quantidade = ?1, updated_at = ?2 WHERE id = ?3",
            params![quantity, format_timestamp(&updated_at), id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MaterialRequest".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: i64,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE material_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), format_timestamp(&updated_at), id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MaterialRequest".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn append_history(&self, entry: &HistoryEntry) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO request_history (
                request_id, actor, campo_alterado, valor_anterior,
                valor_novo, acao, justificativa, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.request_id,
                entry.actor,
                entry.field_changed,
                entry.old_value,
                entry.new_value,
                entry.action.as_str(),
                entry.justification,
                format_timestamp(&entry.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn list_history(&self, request_id: i64) -> RepositoryResult<Vec<HistoryEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, request_id, actor, campo_alterado, valor_anterior,
                   valor_novo, acao, justificativa, created_at
            FROM request_history
            WHERE request_id = ?1
            ORDER BY created_at, id
            "#,
        )?;
        let rows = stmt.query_map(params![request_id], map_history_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    async fn soft_delete_created_before(
        &self,
        cutoff: NaiveDate,
        deleted_at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<i64>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let cutoff = cutoff.format(DATE_FORMAT).to_string();
        let deleted_at = format_timestamp(&deleted_at);

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT id FROM material_requests
                 WHERE deleted_at IS NULL AND date(created_at) < ?1
                 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![cutoff], |row| row.get::<_, i64>(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            ids
        };

        tx.execute(
            "UPDATE material_requests SET deleted_at = ?1, updated_at = ?1
             WHERE deleted_at IS NULL AND date(created_at) < ?2",
            params![deleted_at, cutoff],
        )?;
        tx.commit()?;

        Ok(ids)
    }
}

#[async_trait]
impl ImportBatchRepository for SqliteRequestRepository {
    async fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batches (
                batch_id, filename, total_rows, success_rows, error_rows,
                status, errors_json, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                batch.batch_id,
                batch.filename,
                batch.total_rows,
                batch.success_rows,
                batch.error_rows,
                batch.status.as_str(),
                batch.errors_json,
                format_timestamp(&batch.created_at),
                batch.completed_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(())
    }

    async fn complete_batch(
        &self,
        batch_id: &str,
        success_rows: i64,
        error_rows: i64,
        errors_json: &str,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE import_batches
            SET success_rows = ?1, error_rows = ?2, errors_json = ?3,
                status = ?4, completed_at = ?5
            WHERE batch_id = ?6
            "#,
            params![
                success_rows,
                error_rows,
                errors_json,
                BatchStatus::Completed.as_str(),
                format_timestamp(&completed_at),
                batch_id,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportBatch".to_string(),
                id: batch_id.to_string(),
            });
        }
        Ok(())
    }

    async fn find_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM import_batches WHERE batch_id = ?1", BATCH_COLUMNS);
        let batch = conn
            .query_row(&sql, params![batch_id], map_batch_row)
            .optional()?;
        Ok(batch)
    }

    async fn list_batches(&self) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_batches ORDER BY created_at DESC, batch_id",
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_batch_row)?;

        let mut batches = Vec::new();
        for row in rows {
            batches.push(row?);
        }
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{HistoryAction, Unit, Urgency};
    use chrono::{Duration, TimeZone};
    use tempfile::NamedTempFile;

    fn repo() -> (NamedTempFile, SqliteRequestRepository) {
        let file = NamedTempFile::new().unwrap();
        let repo = SqliteRequestRepository::open(file.path().to_str().unwrap()).unwrap();
        (file, repo)
    }

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0).unwrap()
    }

    fn new_request(quantity: i64, created_at: DateTime<Utc>) -> NewMaterialRequest {
        NewMaterialRequest {
            material_code: "1234567890".to_string(),
            material_description: "Parafuso sextavado".to_string(),
            quantity,
            unit: Unit::Pc,
            requester_name: "Ana".to_string(),
            urgency: Urgency::Normal,
            status: RequestStatus::Pending,
            deadline: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            justification: None,
            import_batch_id: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_request() {
        let (_file, repo) = repo();
        let id = repo.insert_request(&new_request(20, ts(14, 8))).await.unwrap();

        let found = repo.find_request(id).await.unwrap().unwrap();
        assert_eq!(found.quantity, 20);
        assert_eq!(found.unit, Unit::Pc);
        assert_eq!(found.status, RequestStatus::Pending);
        assert_eq!(found.deadline, NaiveDate::from_ymd_opt(2025, 10, 20));
        assert_eq!(found.created_at, ts(14, 8));
        assert!(!found.is_deleted());

        assert!(repo.find_request(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_rejected_by_schema() {
        let (_file, repo) = repo();
        let err = repo.insert_request(&new_request(0, ts(14, 8))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::CheckConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_window_is_inclusive_and_skips_deleted() {
        let (_file, repo) = repo();
        let start = ts(10, 8);
        let inside = repo.insert_request(&new_request(10, start)).await.unwrap();
        let edge = repo
            .insert_request(&new_request(11, start + Duration::hours(24)))
            .await
            .unwrap();
        repo.insert_request(&new_request(12, start + Duration::hours(25)))
            .await
            .unwrap();

        let found = repo
            .find_created_between(start, start + Duration::hours(24))
            .await
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![inside, edge]);

        repo.soft_delete_created_before(NaiveDate::from_ymd_opt(2025, 10, 11).unwrap(), ts(14, 0))
            .await
            .unwrap();
        let found = repo
            .find_created_between(start, start + Duration::hours(24))
            .await
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![edge]);
    }

    #[tokio::test]
    async fn test_update_status_accepts_any_status() {
        let (_file, repo) = repo();
        let id = repo.insert_request(&new_request(20, ts(14, 8))).await.unwrap();

        for status in RequestStatus::ALL {
            repo.update_status(id, status, ts(14, 10)).await.unwrap();
            let found = repo.find_request(id).await.unwrap().unwrap();
            assert_eq!(found.status, status);
            assert_eq!(found.updated_at, ts(14, 10));
        }

        let err = repo
            .update_status(id + 100, RequestStatus::Completed, ts(14, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_quantity_missing_id_is_not_found() {
        let (_file, repo) = repo();
        let err = repo.update_quantity(42, 5, ts(14, 9)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_history_is_listed_in_order() {
        let (_file, repo) = repo();
        let id = repo.insert_request(&new_request(89022, ts(14, 8))).await.unwrap();

        for (action, new_value, hour) in [
            (HistoryAction::Criado, "89022", 8),
            (HistoryAction::Corrigido, "891", 9),
        ] {
            repo.append_history(&HistoryEntry {
                id: None,
                request_id: id,
                actor: "system".to_string(),
                field_changed: "quantidade".to_string(),
                old_value: None,
                new_value: Some(new_value.to_string()),
                action,
                justification: None,
                created_at: ts(14, hour),
            })
            .await
            .unwrap();
        }

        let history = repo.list_history(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, HistoryAction::Criado);
        assert_eq!(history[1].new_value.as_deref(), Some("891"));
        assert!(history.iter().all(|h| h.id.is_some()));
    }

    #[tokio::test]
    async fn test_batch_lifecycle() {
        let (_file, repo) = repo();
        let batch = ImportBatch {
            batch_id: "b-1".to_string(),
            filename: "pedidos.xlsx".to_string(),
            total_rows: 3,
            success_rows: 0,
            error_rows: 0,
            status: BatchStatus::Processing,
            errors_json: None,
            created_at: ts(13, 8),
            completed_at: None,
        };
        repo.insert_batch(&batch).await.unwrap();
        repo.insert_batch(&ImportBatch {
            batch_id: "b-2".to_string(),
            created_at: ts(14, 8),
            ..batch.clone()
        })
        .await
        .unwrap();

        repo.complete_batch("b-1", 2, 1, "[]", ts(13, 9)).await.unwrap();

        let stored = repo.find_batch("b-1").await.unwrap().unwrap();
        assert_eq!(stored.status, BatchStatus::Completed);
        assert_eq!(stored.success_rows, 2);
        assert_eq!(stored.completed_at, Some(ts(13, 9)));

        let listed: Vec<String> = repo
            .list_batches()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.batch_id)
            .collect();
        assert_eq!(listed, vec!["b-2".to_string(), "b-1".to_string()]);

        assert!(matches!(
            repo.complete_batch("missing", 0, 0, "[]", ts(13, 9)).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }
}

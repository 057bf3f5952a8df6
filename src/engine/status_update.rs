// ==========================================
// 物料申请系统 - 状态变更服务
// ==========================================
// 说明: 状态之间无状态机约束；值未变化时不写库也不写历史
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::request::HistoryEntry;
use crate::domain::types::{HistoryAction, RequestStatus};
use crate::engine::error::{CorrectionError, CorrectionResult};
use crate::repository::RequestRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

const STATUS_FIELD: &str = "status";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub id: i64,
    pub old_status: RequestStatus,
    pub new_status: RequestStatus,
    pub changed: bool,
    pub history_id: Option<i64>,
}

pub struct RequestStatusService<R, C>
where
    R: RequestRepository,
    C: ImportConfigReader,
{
    repo: Arc<R>,
    config: C,
}

impl<R, C> RequestStatusService<R, C>
where
    R: RequestRepository,
    C: ImportConfigReader,
{
    pub fn new(repo: Arc<R>, config: C) -> Self {
        Self { repo, config }
    }

    /// 变更申请状态并记录 status_mudado 历史
    ///
    /// # 返回
    /// - Err(RequestNotFound): id 不存在或已软删除
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: i64,
        status: RequestStatus,
        now: DateTime<Utc>,
    ) -> CorrectionResult<StatusChange> {
        let current = match self.repo.find_request(id).await? {
            Some(request) if !request.is_deleted() => request,
            _ => return Err(CorrectionError::RequestNotFound(id)),
        };

        if current.status == status {
            return Ok(StatusChange {
                id,
                old_status: status,
                new_status: status,
                changed: false,
                history_id: None,
            });
        }

        let settings = self.config.get_import_settings().await?;
        self.repo.update_status(id, status, now).await?;

        let history_id = self
            .repo
            .append_history(&HistoryEntry {
                id: None,
                request_id: id,
                actor: settings.history_actor,
                field_changed: STATUS_FIELD.to_string(),
                old_value: Some(current.status.as_str().to_string()),
                new_value: Some(status.as_str().to_string()),
                action: HistoryAction::StatusMudado,
                justification: None,
                created_at: now,
            })
            .await?;

        info!(request_id = id, old = %current.status, new = %status, "状态已变更");

        Ok(StatusChange {
            id,
            old_status: current.status,
            new_status: status,
            changed: true,
            history_id: Some(history_id),
        })
    }
}

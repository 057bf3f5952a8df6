// ==========================================
// 物料申请系统 - 保留期清理服务
// ==========================================
// 职责: 软删除创建日期早于 (今天 - retention_days) 的申请
// 说明: 只写 deleted_at，不物理删除；已软删除的记录不再处理
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::request::HistoryEntry;
use crate::domain::types::HistoryAction;
use crate::engine::error::CorrectionResult;
use crate::repository::RequestRepository;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub cutoff: NaiveDate,
    pub retention_days: i64,
    pub purged: usize,
    pub request_ids: Vec<i64>,
}

pub struct RetentionService<R, C>
where
    R: RequestRepository,
    C: ImportConfigReader,
{
    repo: Arc<R>,
    config: C,
}

impl<R, C> RetentionService<R, C>
where
    R: RequestRepository,
    C: ImportConfigReader,
{
    pub fn new(repo: Arc<R>, config: C) -> Self {
        Self { repo, config }
    }

    /// 截止日期: now 的日期减去保留天数（严格早于该日期的记录被清理）
    pub fn cutoff_for(now: DateTime<Utc>, retention_days: i64) -> NaiveDate {
        (now - Duration::days(retention_days)).date_naive()
    }

    #[instrument(skip(self))]
    pub async fn purge(&self, now: DateTime<Utc>) -> CorrectionResult<PurgeReport> {
        let settings = self.config.get_import_settings().await?;
        let cutoff = Self::cutoff_for(now, settings.retention_days);

        let ids = self.repo.soft_delete_created_before(cutoff, now).await?;

        for id in &ids {
            let entry = HistoryEntry {
                id: None,
                request_id: *id,
                actor: settings.history_actor.clone(),
                field_changed: "deleted_at".to_string(),
                old_value: None,
                new_value: Some(crate::db::format_timestamp(&now)),
                action: HistoryAction::Excluido,
                justification: Some(format!(
                    "Retenção de {} dias expirada",
                    settings.retention_days
                )),
                created_at: now,
            };
            if let Err(e) = self.repo.append_history(&entry).await {
                warn!(request_id = *id, error = %e, "清理历史写入失败");
            }
        }

        info!(
            cutoff = %cutoff,
            retention_days = settings.retention_days,
            purged = ids.len(),
            "保留期清理完成"
        );

        Ok(PurgeReport {
            cutoff,
            retention_days: settings.retention_days,
            purged: ids.len(),
            request_ids: ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;
    use crate::repository::SqliteRequestRepository;
    use chrono::TimeZone;

    type Service = RetentionService<SqliteRequestRepository, DefaultConfig>;

    #[test]
    fn test_cutoff_is_forty_five_days_back() {
        let now = Utc.with_ymd_and_hms(2025, 10, 14, 3, 0, 0).unwrap();
        assert_eq!(
            Service::cutoff_for(now, 45),
            NaiveDate::from_ymd_opt(2025, 8, 30).unwrap()
        );
    }
}

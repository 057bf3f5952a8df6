// ==========================================
// 物料申请系统 - 可疑数量扫描与修正服务
// ==========================================
// 职责: 按导入批次的时间窗口扫描申请，产出修正候选；确认后写入修正
// 红线: 未显式确认（confirm = true）时不做任何写入
// 红线: 单条记录 / 单个批次失败只记录，不中断扫描
// 幂等: 应用前重新读取当前值并重新判定，已修正的值不会再次除以 100
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::correction::{CorrectionCandidate, SuspicionRule};
use crate::domain::request::{HistoryEntry, ImportBatch, MaterialRequest};
use crate::domain::types::HistoryAction;
use crate::engine::error::{CorrectionError, CorrectionResult};
use crate::engine::suspicious_quantity::QuantityHeuristic;
use crate::repository::{ImportBatchRepository, RequestRepository};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// 修正历史的字段名
const QUANTITY_FIELD: &str = "quantidade";

// ==========================================
// 扫描范围 / 模式
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanScope {
    AllBatches,
    Batch(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Analyze,
    Apply,
}

// ==========================================
// 扫描报告
// ==========================================

/// 单个批次的扫描摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchScanSummary {
    pub batch_id: String,
    pub filename: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub requests_scanned: usize,
    pub flagged: usize,
}

/// 已应用的修正
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCorrection {
    pub id: i64,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub rule: SuspicionRule,
    pub history_id: Option<i64>,
}

/// 跳过的记录（重新读取后已不可疑 / 已删除）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub id: i64,
    pub reason: String,
}

/// 失败明细（记录级或批次级）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub mode: ScanMode,
    pub batches_scanned: usize,
    pub total_requests: usize,
    pub total_flagged: usize,
    pub total_corrected: usize,
    pub total_skipped: usize,
    pub total_failed: usize,
    pub batches: Vec<BatchScanSummary>,
    pub candidates: Vec<CorrectionCandidate>,
    pub corrections: Vec<AppliedCorrection>,
    pub skipped: Vec<SkippedRecord>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            batches_scanned: 0,
            total_requests: 0,
            total_flagged: 0,
            total_corrected: 0,
            total_skipped: 0,
            total_failed: 0,
            batches: Vec::new(),
            candidates: Vec::new(),
            corrections: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.batches_scanned = self.batches.len();
        self.total_flagged = self.candidates.len();
        self.total_corrected = self.corrections.len();
        self.total_skipped = self.skipped.len();
        self.total_failed = self.failures.len();
        self
    }
}

// ==========================================
// QuantityCorrectionService
// ==========================================
pub struct QuantityCorrectionService<R, C>
where
    R: RequestRepository + ImportBatchRepository,
    C: ImportConfigReader,
{
    repo: Arc<R>,
    config: C,
}

impl<R, C> QuantityCorrectionService<R, C>
where
    R: RequestRepository + ImportBatchRepository,
    C: ImportConfigReader,
{
    pub fn new(repo: Arc<R>, config: C) -> Self {
        Self { repo, config }
    }

    /// 只读扫描，返回修正候选
    #[instrument(skip(self))]
    pub async fn analyze(&self, scope: ScanScope) -> CorrectionResult<ScanReport> {
        let heuristic = QuantityHeuristic::new(self.config.get_suspicion_thresholds().await?);
        let report = self.scan(&scope, &heuristic, ScanMode::Analyze).await?;

        info!(
            batches = report.batches_scanned,
            requests = report.total_requests,
            flagged = report.total_flagged,
            failed = report.total_failed,
            "可疑数量分析完成（未写库）"
        );
        Ok(report)
    }

    /// 扫描并应用修正
    ///
    /// # 返回
    /// - Err(ConfirmationRequired): confirm = false，未做任何读写
    #[instrument(skip(self))]
    pub async fn apply(&self, scope: ScanScope, confirm: bool) -> CorrectionResult<ScanReport> {
        if !confirm {
            warn!("未确认的修正请求已拒绝");
            return Err(CorrectionError::ConfirmationRequired);
        }

        let settings = self.config.get_import_settings().await?;
        let heuristic = QuantityHeuristic::new(self.config.get_suspicion_thresholds().await?);
        let mut report = self.scan(&scope, &heuristic, ScanMode::Apply).await?;

        let candidates = report.candidates.clone();
        for candidate in &candidates {
            match self
                .apply_one(candidate, &heuristic, &settings.history_actor)
                .await
            {
                Ok(ApplyOutcome::Corrected(correction)) => report.corrections.push(correction),
                Ok(ApplyOutcome::Skipped(skipped)) => report.skipped.push(skipped),
                Ok(ApplyOutcome::HistoryFailed(correction, e)) => {
                    report.failures.push(ScanFailure {
                        id: Some(correction.id),
                        batch_id: None,
                        error: format!("histórico não registrado: {}", e),
                    });
                    report.corrections.push(correction);
                }
                Err(e) => {
                    error!(request_id = candidate.id, error = %e, "修正写入失败");
                    report.failures.push(ScanFailure {
                        id: Some(candidate.id),
                        batch_id: None,
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = report.finish();
        info!(
            batches = report.batches_scanned,
            flagged = report.total_flagged,
            corrected = report.total_corrected,
            skipped = report.total_skipped,
            failed = report.total_failed,
            "可疑数量修正完成"
        );
        Ok(report)
    }

    // ==========================================
    // 内部流程
    // ==========================================

    async fn resolve_batches(&self, scope: &ScanScope) -> CorrectionResult<Vec<ImportBatch>> {
        match scope {
            ScanScope::AllBatches => Ok(self.repo.list_batches().await?),
            ScanScope::Batch(batch_id) => match self.repo.find_batch(batch_id).await? {
                Some(batch) => Ok(vec![batch]),
                None => Err(CorrectionError::BatchNotFound(batch_id.clone())),
            },
        }
    }

    /// 扫描批次窗口；同一申请出现在多个重叠窗口中时只计一次
    async fn scan(
        &self,
        scope: &ScanScope,
        heuristic: &QuantityHeuristic,
        mode: ScanMode,
    ) -> CorrectionResult<ScanReport> {
        let settings = self.config.get_import_settings().await?;
        let window = Duration::hours(settings.batch_window_hours);
        let batches = self.resolve_batches(scope).await?;

        let mut report = ScanReport::new(mode);
        let mut seen: HashSet<i64> = HashSet::new();

        for batch in batches {
            let window_start = batch.created_at;
            let window_end = batch.created_at + window;

            let requests: Vec<MaterialRequest> =
                match self.repo.find_created_between(window_start, window_end).await {
                    Ok(requests) => requests,
                    Err(e) => {
                        warn!(batch_id = %batch.batch_id, error = %e, "批次窗口读取失败");
                        report.failures.push(ScanFailure {
                            id: None,
                            batch_id: Some(batch.batch_id.clone()),
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

            let mut flagged = 0;
            for request in &requests {
                if !seen.insert(request.id) {
                    continue;
                }
                report.total_requests += 1;
                if let Some(candidate) = heuristic.evaluate(request) {
                    flagged += 1;
                    report.candidates.push(candidate);
                }
            }

            info!(
                batch_id = %batch.batch_id,
                requests = requests.len(),
                flagged,
                "批次扫描完成"
            );

            report.batches.push(BatchScanSummary {
                batch_id: batch.batch_id,
                filename: batch.filename,
                window_start,
                window_end,
                requests_scanned: requests.len(),
                flagged,
            });
        }

        Ok(report.finish())
    }

    async fn apply_one(
        &self,
        candidate: &CorrectionCandidate,
        heuristic: &QuantityHeuristic,
        actor: &str,
    ) -> CorrectionResult<ApplyOutcome> {
        // 重新读取当前值
        let current = match self.repo.find_request(candidate.id).await? {
            Some(request) if !request.is_deleted() => request,
            Some(_) => return Ok(ApplyOutcome::skipped(candidate.id, "solicitação excluída")),
            None => return Ok(ApplyOutcome::skipped(candidate.id, "solicitação não encontrada")),
        };

        // 重新判定
        let fresh = match heuristic.evaluate(&current) {
            Some(fresh) => fresh,
            None => {
                return Ok(ApplyOutcome::skipped(
                    candidate.id,
                    &format!("quantidade atual {} não é suspeita", current.quantity),
                ))
            }
        };

        let now = Utc::now();
        self.repo
            .update_quantity(current.id, fresh.suggested_quantity, now)
            .await?;
        info!(
            request_id = current.id,
            old = current.quantity,
            new = fresh.suggested_quantity,
            rule = %fresh.rule,
            "数量已修正"
        );

        let mut correction = AppliedCorrection {
            id: current.id,
            old_quantity: current.quantity,
            new_quantity: fresh.suggested_quantity,
            rule: fresh.rule,
            history_id: None,
        };

        let history = HistoryEntry {
            id: None,
            request_id: current.id,
            actor: actor.to_string(),
            field_changed: QUANTITY_FIELD.to_string(),
            old_value: Some(current.quantity.to_string()),
            new_value: Some(fresh.suggested_quantity.to_string()),
            action: HistoryAction::Corrigido,
            justification: Some(format!(
                "Correção automática: {} → {} (÷{}, {})",
                current.quantity,
                fresh.suggested_quantity,
                heuristic.thresholds().correction_divisor,
                fresh.rule.code()
            )),
            created_at: now,
        };

        match self.repo.append_history(&history).await {
            Ok(history_id) => {
                correction.history_id = Some(history_id);
                Ok(ApplyOutcome::Corrected(correction))
            }
            Err(e) => {
                error!(request_id = current.id, error = %e, "修正历史写入失败");
                Ok(ApplyOutcome::HistoryFailed(correction, e.to_string()))
            }
        }
    }
}

enum ApplyOutcome {
    Corrected(AppliedCorrection),
    Skipped(SkippedRecord),
    HistoryFailed(AppliedCorrection, String),
}

impl ApplyOutcome {
    fn skipped(id: i64, reason: &str) -> Self {
        ApplyOutcome::Skipped(SkippedRecord {
            id,
            reason: reason.to_string(),
        })
    }
}

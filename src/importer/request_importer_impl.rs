// ==========================================
// 物料申请系统 - 申请导入器实现
// ==========================================
// 流程:
// 1. 文件解析（跳过空白行）
// 2. 结构检查（空文件 / 行数上限），失败时不写库
// 3. 创建批次（processing）
// 4. 逐行校验 → 插入申请（Pendente）→ 写入 'criado' 历史
// 5. 回写批次统计（completed）
// 红线: 单行失败只记录，不中断后续行
// ==========================================

use crate::config::{ImportConfigReader, ImportSettings};
use crate::domain::request::{BatchStatus, HistoryEntry, ImportBatch, ImportRow};
use crate::domain::types::HistoryAction;
use crate::importer::date_parser::DateParser;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{FileParser, UniversalFileParser};
use crate::importer::request_importer_trait::{
    ImportReport, RequestImporter, RowFailure, RowWarning, ValidationReport,
};
use crate::importer::row_validator::RowValidator;
use crate::repository::{ImportBatchRepository, RequestRepository};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 导入历史的字段名
const IMPORT_HISTORY_FIELD: &str = "importação";

// ==========================================
// RequestImporterImpl - 申请导入器实现
// ==========================================
pub struct RequestImporterImpl<R, C>
where
    R: RequestRepository + ImportBatchRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    repo: Arc<R>,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    date_parser: DateParser,
}

impl<R, C> RequestImporterImpl<R, C>
where
    R: RequestRepository + ImportBatchRepository,
    C: ImportConfigReader,
{
    /// 创建导入器（默认解析器，参考年份取当前年）
    pub fn new(repo: Arc<R>, config: C) -> Self {
        Self::with_components(repo, config, Box::new(UniversalFileParser), DateParser::current())
    }

    /// 创建导入器（可注入解析器与参考年份）
    pub fn with_components(
        repo: Arc<R>,
        config: C,
        file_parser: Box<dyn FileParser>,
        date_parser: DateParser,
    ) -> Self {
        Self {
            repo,
            config,
            file_parser,
            date_parser,
        }
    }

    fn check_structure(rows: &[ImportRow], settings: &ImportSettings) -> ImportResult<()> {
        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }
        if rows.len() > settings.max_rows {
            return Err(ImportError::TooManyRows {
                rows: rows.len(),
                max: settings.max_rows,
            });
        }
        Ok(())
    }

    fn file_name_of(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }
}

#[async_trait]
impl<R, C> RequestImporter for RequestImporterImpl<R, C>
where
    R: RequestRepository + ImportBatchRepository + 'static,
    C: ImportConfigReader,
{
    #[instrument(skip(self, file_path), fields(file = %file_path.display()))]
    async fn import_file(&self, file_path: &Path) -> ImportResult<ImportReport> {
        debug!("步骤 1: 解析文件");
        let rows = self.file_parser.parse_rows(file_path).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        info!(total_rows = rows.len(), "文件解析完成");

        self.import_rows(&Self::file_name_of(file_path), rows).await
    }

    #[instrument(skip(self, rows), fields(batch_id))]
    async fn import_rows(
        &self,
        source_name: &str,
        rows: Vec<ImportRow>,
    ) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        let settings = self.config.get_import_settings().await?;

        // === 步骤 2: 结构检查 ===
        Self::check_structure(&rows, &settings)?;

        // === 步骤 3: 创建批次 ===
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        let created_at = Utc::now();

        self.repo
            .insert_batch(&ImportBatch {
                batch_id: batch_id.clone(),
                filename: source_name.to_string(),
                total_rows: rows.len() as i64,
                success_rows: 0,
                error_rows: 0,
                status: BatchStatus::Processing,
                errors_json: None,
                created_at,
                completed_at: None,
            })
            .await?;
        info!(batch_id = %batch_id, filename = %source_name, total_rows = rows.len(), "开始导入申请");

        // === 步骤 4: 逐行处理 ===
        let validator = RowValidator::new(&settings, self.date_parser);
        let mut request_ids = Vec::new();
        let mut failures = Vec::new();
        let mut warnings = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            let row_number = row.source_row().unwrap_or_else(|| settings.row_number(idx));

            let validated = match validator.normalize(row, row_number) {
                Ok(validated) => validated,
                Err(ImportError::RowValidationFailed { errors, .. }) => {
                    warn!(row_number, errors = ?errors, "行校验失败");
                    failures.push(RowFailure { row_number, errors });
                    continue;
                }
                Err(e) => {
                    warn!(row_number, error = %e, "行处理失败");
                    failures.push(RowFailure {
                        row_number,
                        errors: vec![format!("Linha {}: {}", row_number, e)],
                    });
                    continue;
                }
            };

            for warning in &validated.warnings {
                warn!(row_number, raw = %warning.raw, parsed = warning.parsed, "数量量级可疑");
                warnings.push(RowWarning {
                    row_number,
                    message: format!("Linha {}: {}", row_number, warning.message()),
                });
            }

            let new_request = validated.into_new_request(Some(batch_id.clone()), created_at);
            let request_id = match self.repo.insert_request(&new_request).await {
                Ok(id) => id,
                Err(e) => {
                    error!(row_number, error = %e, "申请写入失败");
                    failures.push(RowFailure {
                        row_number,
                        errors: vec![format!("Linha {}: Erro ao salvar: {}", row_number, e)],
                    });
                    continue;
                }
            };

            let history = HistoryEntry {
                id: None,
                request_id,
                actor: settings.history_actor.clone(),
                field_changed: IMPORT_HISTORY_FIELD.to_string(),
                old_value: None,
                new_value: Some(format!("via planilha, lote {}", batch_id)),
                action: HistoryAction::Criado,
                justification: None,
                created_at,
            };
            if let Err(e) = self.repo.append_history(&history).await {
                error!(request_id, error = %e, "导入历史写入失败");
                warnings.push(RowWarning {
                    row_number,
                    message: format!("Linha {}: histórico não registrado: {}", row_number, e),
                });
            }

            debug!(row_number, request_id, "行导入成功");
            request_ids.push(request_id);
        }

        // === 步骤 5: 回写批次 ===
        let errors_json = serde_json::to_string(&failures)?;
        self.repo
            .complete_batch(
                &batch_id,
                request_ids.len() as i64,
                failures.len() as i64,
                &errors_json,
                Utc::now(),
            )
            .await?;

        info!(
            batch_id = %batch_id,
            imported = request_ids.len(),
            failed = failures.len(),
            warnings = warnings.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "导入完成"
        );

        Ok(ImportReport {
            batch_id,
            filename: source_name.to_string(),
            total: rows.len(),
            imported: request_ids.len(),
            failed: failures.len(),
            request_ids,
            failures,
            warnings,
        })
    }

    #[instrument(skip(self, file_path), fields(file = %file_path.display()))]
    async fn validate_file(&self, file_path: &Path) -> ImportResult<ValidationReport> {
        let rows = self.file_parser.parse_rows(file_path)?;
        self.validate_rows(&rows).await
    }

    async fn validate_rows(&self, rows: &[ImportRow]) -> ImportResult<ValidationReport> {
        let settings = self.config.get_import_settings().await?;
        Self::check_structure(rows, &settings)?;

        let validator = RowValidator::new(&settings, self.date_parser);
        let mut valid = Vec::new();
        let mut errors = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            let row_number = row.source_row().unwrap_or_else(|| settings.row_number(idx));
            match validator.normalize(row, row_number) {
                Ok(validated) => valid.push(validated),
                Err(ImportError::RowValidationFailed { errors: row_errors, .. }) => {
                    errors.push(RowFailure {
                        row_number,
                        errors: row_errors,
                    })
                }
                Err(e) => errors.push(RowFailure {
                    row_number,
                    errors: vec![format!("Linha {}: {}", row_number, e)],
                }),
            }
        }

        info!(
            total_rows = rows.len(),
            valid_rows = valid.len(),
            invalid_rows = errors.len(),
            "校验完成（未写库）"
        );

        let valid_rows = valid.len();
        valid.truncate(settings.preview_rows);

        Ok(ValidationReport {
            total_rows: rows.len(),
            valid_rows,
            invalid_rows: errors.len(),
            errors,
            preview: valid,
        })
    }
}

// ==========================================
// 物料申请系统 - 申请导入 Trait
// ==========================================
// 职责: 定义导入接口与报告结构（不包含实现）
// ==========================================

use crate::domain::request::ImportRow;
use crate::importer::error::ImportResult;
use crate::importer::row_validator::ValidatedRow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ==========================================
// 报告结构
// ==========================================

/// 单行失败明细（同时写入 import_batches.errors_json）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row_number: usize,
    pub errors: Vec<String>,
}

/// 单行告警（不阻断导入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowWarning {
    pub row_number: usize,
    pub message: String,
}

/// 导入结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub batch_id: String,
    pub filename: String,
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    pub request_ids: Vec<i64>,
    pub failures: Vec<RowFailure>,
    pub warnings: Vec<RowWarning>,
}

/// 仅校验结果（不写库）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub errors: Vec<RowFailure>,
    pub preview: Vec<ValidatedRow>,
}

// ==========================================
// RequestImporter Trait
// ==========================================
// 实现者: RequestImporterImpl
#[async_trait]
pub trait RequestImporter: Send + Sync {
    /// 从文件导入（.xlsx/.xls/.csv）
    ///
    /// # 返回
    /// - Ok(ImportReport): 行级失败已收集在报告中
    /// - Err: 文件不可读、空文件、超过行数上限、批次写入失败
    async fn import_file(&self, file_path: &Path) -> ImportResult<ImportReport>;

    /// 导入已解析的行
    async fn import_rows(&self, source_name: &str, rows: Vec<ImportRow>)
        -> ImportResult<ImportReport>;

    /// 仅校验文件
    async fn validate_file(&self, file_path: &Path) -> ImportResult<ValidationReport>;

    /// 仅校验已解析的行
    async fn validate_rows(&self, rows: &[ImportRow]) -> ImportResult<ValidationReport>;
}

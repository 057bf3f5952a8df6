// ==========================================
// 物料申请系统 - 申请领域模型
// ==========================================
// 职责: 导入中间结构 / 申请实体 / 导入批次 / 历史记录
// 对齐: db.rs material_requests / import_batches / request_history 表
// ==========================================

use crate::domain::types::{HistoryAction, RequestStatus, Unit, Urgency};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// RawCell - 原始单元格值
// ==========================================
// 保留 Excel 的类型信息：序列号日期、数值数量不能先转成字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Empty,
    Number(f64),
    Text(String),
}

impl RawCell {
    /// 空值或全空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            RawCell::Number(_) => false,
        }
    }

    /// 转为去空白的文本（空值返回 None）
    ///
    /// 整数值的浮点数按整数输出（Excel 把 "1234567890" 存为 1234567890.0）
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            RawCell::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{:.0}", n))
                } else {
                    Some(n.to_string())
                }
            }
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.to_string())
    }
}

impl From<String> for RawCell {
    fn from(value: String) -> Self {
        RawCell::Text(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Number(value)
    }
}

impl From<i64> for RawCell {
    fn from(value: i64) -> Self {
        RawCell::Number(value as f64)
    }
}

// ==========================================
// ImportRow - 导入中间结构体
// ==========================================
// 用途: 文件解析产物（列名 → 原始值），不落库
// 列名保持表头原文，别名解析在 FieldMapper 中完成
// source_row: 文件中的物理行号（1 起，含表头），空白行被跳过后仍保持准确
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    cells: HashMap<String, RawCell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_row: Option<usize>,
}

impl ImportRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式构造（测试与模板生成使用）
    pub fn with(mut self, column: &str, value: impl Into<RawCell>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn with_source_row(mut self, row_number: usize) -> Self {
        self.source_row = Some(row_number);
        self
    }

    pub fn source_row(&self) -> Option<usize> {
        self.source_row
    }

    pub fn insert(&mut self, column: &str, value: impl Into<RawCell>) {
        self.cells.insert(column.trim().to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&RawCell> {
        self.cells.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &RawCell)> {
        self.cells.iter()
    }

    /// 所有单元格为空
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(RawCell::is_blank)
    }
}

// ==========================================
// NewMaterialRequest - 待插入的申请
// ==========================================
// 由 RowValidator 规范化后产生；created_at 由导入器统一赋值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaterialRequest {
    pub material_code: String,
    pub material_description: String,
    pub quantity: i64,
    pub unit: Unit,
    pub requester_name: String,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub deadline: NaiveDate,
    pub justification: Option<String>,
    pub import_batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// MaterialRequest - 物料申请（持久化）
// ==========================================
// 不变量: quantity > 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequest {
    pub id: i64,
    pub material_code: String,
    pub material_description: String,
    pub quantity: i64,
    pub unit: Unit,
    pub requester_name: String,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub deadline: Option<NaiveDate>,
    pub justification: Option<String>,
    pub import_batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>, // 软删除标记
}

impl MaterialRequest {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// ==========================================
// ImportBatch - 导入批次
// ==========================================
// 用途: 一次上传产生的所有申请；created_at 起 24h 窗口用于启发式扫描
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub batch_id: String,
    pub filename: String,
    pub total_rows: i64,
    pub success_rows: i64,
    pub error_rows: i64,
    pub status: BatchStatus,
    pub errors_json: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "completed" => BatchStatus::Completed,
            _ => BatchStatus::Processing,
        }
    }
}

// ==========================================
// HistoryEntry - 申请历史（审计）
// ==========================================
// 红线: 每次数量修正都必须写一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Option<i64>, // 插入前为 None
    pub request_id: i64,
    pub actor: String,
    pub field_changed: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub action: HistoryAction,
    pub justification: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cell_integral_number_as_text() {
        assert_eq!(
            RawCell::Number(1234567890.0).as_text(),
            Some("1234567890".to_string())
        );
        assert_eq!(RawCell::Number(12.5).as_text(), Some("12.5".to_string()));
    }

    #[test]
    fn test_raw_cell_blank_text_is_none() {
        assert!(RawCell::Text("   ".to_string()).is_blank());
        assert_eq!(RawCell::Text("  x ".to_string()).as_text(), Some("x".to_string()));
        assert_eq!(RawCell::Empty.as_text(), None);
    }

    #[test]
    fn test_import_row_blank_detection() {
        let row = ImportRow::new().with("Material", "").with("Quantidade", RawCell::Empty);
        assert!(row.is_blank());

        let row = row.with("Solicitante", "Ana");
        assert!(!row.is_blank());
    }
}

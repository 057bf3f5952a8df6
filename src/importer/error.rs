// ==========================================
// 物料申请系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级错误（数量/日期/行校验）只在行内收集，不中断整个导入
// ==========================================

use crate::config::ConfigError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 结构性错误（写入前拒绝） =====
    #[error("文件无数据行")]
    EmptyFile,

    #[error("数据行过多: {rows} 行，上限 {max} 行")]
    TooManyRows { rows: usize, max: usize },

    // ===== 字段解析错误 =====
    #[error("数量无效 ({value}): {message}")]
    InvalidQuantity { value: String, message: String },

    #[error("日期无效: {value}")]
    InvalidDate { value: String },

    #[error("行校验失败 (行 {row_number}): {}", .errors.join("; "))]
    RowValidationFailed {
        row_number: usize,
        errors: Vec<String>,
    },

    // ===== 协作方错误 =====
    #[error("持久化失败: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("配置读取失败: {0}")]
    Config(#[from] ConfigError),

    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_validation_message_joins_errors() {
        let err = ImportError::RowValidationFailed {
            row_number: 3,
            errors: vec![
                "Linha 3: Material é obrigatório".to_string(),
                "Linha 3: Quantidade é obrigatória".to_string(),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("Material é obrigatório; Linha 3: Quantidade"));
    }
}

// ==========================================
// 物料申请系统 - 导入层
// ==========================================
// 职责: 表格文件 → 校验 → 物料申请
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod date_parser;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod quantity_parser;
pub mod request_importer_impl;
pub mod request_importer_trait;
pub mod row_validator;
pub mod template;

// 重导出核心类型
pub use date_parser::{excel_serial_to_date, format_iso, DateParser};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{FieldMapper, RequestField};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use quantity_parser::{normalize_quantity, parse_quantity, ParsedQuantity, QuantityWarning};
pub use request_importer_impl::RequestImporterImpl;
pub use row_validator::{RowValidator, ValidatedRow};
pub use template::{write_template, write_template_file};

// 重导出 Trait 接口
pub use request_importer_trait::{
    ImportReport, RequestImporter, RowFailure, RowWarning, ValidationReport,
};

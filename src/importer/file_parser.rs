// ==========================================
// 物料申请系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 约定: 第一行为表头；完全空白的行跳过
// Excel 单元格保留类型（数值 / 日期序列号 / 文本）
// ==========================================

use crate::domain::request::{ImportRow, RawCell};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行（不做字段校验）
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<ImportRow>>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
// 分隔符: 表头含 ';' 且不含 ',' 时使用 ';'（Excel 葡萄牙语区域导出）
pub struct CsvParser;

impl CsvParser {
    /// 从内存文本解析（文件解析与测试共用）
    pub fn parse_str(&self, content: &str) -> ImportResult<Vec<ImportRow>> {
        let content = content.trim_start_matches('\u{feff}');
        let header_line = content.lines().next().unwrap_or("");
        let delimiter = if header_line.contains(';') && !header_line.contains(',') {
            b';'
        } else {
            b','
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row = ImportRow::new();
            if let Some(position) = record.position() {
                row = row.with_source_row(position.line() as usize);
            }

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    let cell = if value.trim().is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(value.trim().to_string())
                    };
                    row.insert(header, cell);
                }
            }

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

impl FileParser for CsvParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<ImportRow>> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let content = std::fs::read_to_string(file_path)?;
        self.parse_str(&content)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    fn to_raw_cell(cell: &Data) -> RawCell {
        match cell {
            Data::Empty | Data::Error(_) => RawCell::Empty,
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::Float(f) => RawCell::Number(*f),
            // 日期单元格还原为序列号，交给日期解析器
            Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
            Data::DateTimeIso(s) => {
                let date_part = s.split('T').next().unwrap_or(s.as_str());
                RawCell::Text(date_part.trim().to_string())
            }
            Data::String(s) | Data::DurationIso(s) => {
                if s.trim().is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::Text(s.trim().to_string())
                }
            }
            Data::Bool(b) => RawCell::Text(b.to_string()),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<ImportRow>> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut sheet_rows = range.rows();
        let header_row = sheet_rows.next().ok_or(ImportError::EmptyFile)?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        // range 可能不从 A1 开始；物理行号 = 起始行 + 偏移 + 1
        let header_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

        let mut rows = Vec::new();
        for (offset, data_row) in sheet_rows.enumerate() {
            let mut row = ImportRow::new().with_source_row(header_line + offset + 1);
            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    row.insert(header, Self::to_raw_cell(cell));
                }
            }

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<ImportRow>> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse_rows(file_path),
            "xlsx" | "xls" => ExcelParser.parse_rows(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn csv_file(content: &str) -> NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        write!(temp_file, "{}", content).unwrap();
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let file = csv_file(
            "Material,Descrição,Quantidade\n1234567890,Parafuso,\"5438,975\"\n",
        );
        let rows = CsvParser.parse_rows(file.path()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Material"), Some(&RawCell::from("1234567890")));
        assert_eq!(rows[0].get("Quantidade"), Some(&RawCell::from("5438,975")));
    }

    #[test]
    fn test_semicolon_delimiter_is_detected() {
        let rows = CsvParser
            .parse_str("Material;Quantidade;Prazo\n1234567890;5438,975;20/out\n")
            .unwrap();
        assert_eq!(rows[0].get("Quantidade"), Some(&RawCell::from("5438,975")));
        assert_eq!(rows[0].get("Prazo"), Some(&RawCell::from("20/out")));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let rows = CsvParser
            .parse_str("Material,Quantidade\n1234567890,2\n,\n   ,  \n1234567891,3\n")
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_csv_rows_keep_physical_line_numbers() {
        let rows = CsvParser
            .parse_str("Material,Quantidade\n1234567890,2\n,\n\n1234567891,3\n")
            .unwrap();
        let lines: Vec<Option<usize>> = rows.iter().map(ImportRow::source_row).collect();
        assert_eq!(lines, vec![Some(2), Some(5)]);
    }

    #[test]
    fn test_csv_blank_values_become_empty_cells() {
        let rows = CsvParser.parse_str("Material,Quantidade\n1234567890,  \n").unwrap();
        assert_eq!(rows[0].get("Quantidade"), Some(&RawCell::Empty));
    }

    #[test]
    fn test_file_not_found_and_unsupported_format() {
        let result = CsvParser.parse_rows(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));

        let txt = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse_rows(txt.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_excel_cells_keep_their_types() {
        assert_eq!(ExcelParser::to_raw_cell(&Data::Int(20)), RawCell::Number(20.0));
        assert_eq!(ExcelParser::to_raw_cell(&Data::Float(12.5)), RawCell::Number(12.5));
        assert_eq!(
            ExcelParser::to_raw_cell(&Data::String(" 20/out ".to_string())),
            RawCell::from("20/out")
        );
        assert_eq!(
            ExcelParser::to_raw_cell(&Data::DateTimeIso("2025-10-20T00:00:00".to_string())),
            RawCell::from("2025-10-20")
        );
        assert_eq!(ExcelParser::to_raw_cell(&Data::Empty), RawCell::Empty);
    }
}

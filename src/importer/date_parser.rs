// ==========================================
// 物料申请系统 - 日期解析器
// ==========================================
// 支持格式:
// - Excel 序列号（数值单元格，基准 1899-12-30，忽略小数时间部分）
// - yyyy-mm-dd
// - dd/mm/yyyy、dd-mm-yyyy
// - dd/mmm、dd-mmm、dd/mmm/yyyy、dd-mmm-yyyy（葡萄牙语月份缩写）
// ==========================================

use crate::domain::request::RawCell;
use crate::importer::error::{ImportError, ImportResult};
use chrono::{Datelike, Duration, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid ISO date regex"));

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("valid numeric date regex")
});

static ABBREVIATED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})[/-]([a-zç]{3})(?:[/-](\d{4}))?$")
        .expect("valid abbreviated date regex")
});

/// 葡萄牙语月份缩写（下标 + 1 即月份）
const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Excel 序列号上限（9999-12-31）
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

// ==========================================
// DateParser
// ==========================================
// reference_year: 缩写格式缺少年份时使用（测试可注入）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParser {
    reference_year: i32,
}

impl DateParser {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    /// 以本地当前年份为参考年份
    pub fn current() -> Self {
        Self::new(Local::now().year())
    }

    /// 解析原始日期单元格
    pub fn parse(&self, cell: &RawCell) -> ImportResult<NaiveDate> {
        match cell {
            RawCell::Empty => Err(invalid_date("")),
            RawCell::Number(serial) => excel_serial_to_date(*serial),
            RawCell::Text(raw) => self.parse_text(raw),
        }
    }

    /// 解析文本日期
    fn parse_text(&self, raw: &str) -> ImportResult<NaiveDate> {
        let text = raw.trim();

        if let Some(caps) = ISO_DATE.captures(text) {
            return build_date(raw, &caps[1], &caps[2], &caps[3]);
        }

        if let Some(caps) = ABBREVIATED_DATE.captures(text) {
            let month = month_from_abbreviation(&caps[2]).ok_or_else(|| invalid_date(raw))?;
            let year = match caps.get(3) {
                Some(y) => y.as_str().parse::<i32>().map_err(|_| invalid_date(raw))?,
                None => self.reference_year,
            };
            let day = caps[1].parse::<u32>().map_err(|_| invalid_date(raw))?;
            return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid_date(raw));
        }

        if let Some(caps) = NUMERIC_DATE.captures(text) {
            return build_date(raw, &caps[3], &caps[2], &caps[1]);
        }

        Err(invalid_date(raw))
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::current()
    }
}

/// Excel 序列号 → 日期
///
/// 基准 1899-12-30 抵消了 Excel 的 1900 闰年错误
pub fn excel_serial_to_date(serial: f64) -> ImportResult<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return Err(invalid_date(&serial.to_string()));
    }

    let base = NaiveDate::from_ymd_opt(1899, 12, 30).ok_or_else(|| invalid_date("1899-12-30"))?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
        .ok_or_else(|| invalid_date(&serial.to_string()))
}

/// 日期 → yyyy-mm-dd
pub fn format_iso(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn month_from_abbreviation(abbr: &str) -> Option<u32> {
    let lower = abbr.to_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| *m == lower)
        .map(|idx| idx as u32 + 1)
}

fn build_date(raw: &str, year: &str, month: &str, day: &str) -> ImportResult<NaiveDate> {
    let year = year.parse::<i32>().map_err(|_| invalid_date(raw))?;
    let month = month.parse::<u32>().map_err(|_| invalid_date(raw))?;
    let day = day.parse::<u32>().map_err(|_| invalid_date(raw))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid_date(raw))
}

fn invalid_date(value: &str) -> ImportError {
    ImportError::InvalidDate {
        value: value.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DateParser {
        DateParser::new(2025)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_dates_pass_through() {
        for raw in ["2025-10-20", "2024-02-29", "1999-01-01", "2030-12-31"] {
            let date = parser().parse(&RawCell::from(raw)).unwrap();
            assert_eq!(format_iso(&date), raw);
        }
    }

    #[test]
    fn test_brazilian_numeric_dates() {
        assert_eq!(parser().parse_text("20/10/2025").unwrap(), ymd(2025, 10, 20));
        assert_eq!(parser().parse_text("5-3-2026").unwrap(), ymd(2026, 3, 5));
    }

    #[test]
    fn test_abbreviated_month_uses_reference_year() {
        assert_eq!(parser().parse_text("20/out").unwrap(), ymd(2025, 10, 20));
        assert_eq!(parser().parse_text("1-FEV").unwrap(), ymd(2025, 2, 1));
        assert_eq!(parser().parse_text("15/dez/2026").unwrap(), ymd(2026, 12, 15));
        assert_eq!(DateParser::new(2031).parse_text("03-set").unwrap(), ymd(2031, 9, 3));
    }

    #[test]
    fn test_excel_serials() {
        assert_eq!(excel_serial_to_date(1.0).unwrap(), ymd(1899, 12, 31));
        assert_eq!(excel_serial_to_date(45950.0).unwrap(), ymd(2025, 10, 20));
        assert_eq!(excel_serial_to_date(45950.75).unwrap(), ymd(2025, 10, 20));
        assert!(excel_serial_to_date(0.0).is_err());
        assert!(excel_serial_to_date(-3.0).is_err());
        assert!(excel_serial_to_date(f64::NAN).is_err());
    }

    #[test]
    fn test_unrecognized_and_impossible_dates() {
        for raw in ["", "amanhã", "20/oct", "2025/10/20", "31/02/2025", "2025-13-01", "32/out"] {
            assert!(
                matches!(parser().parse_text(raw), Err(ImportError::InvalidDate { .. })),
                "{raw} deveria falhar"
            );
        }
        assert!(parser().parse(&RawCell::Empty).is_err());
    }
}

// ==========================================
// 物料申请系统 - 数量解析器
// ==========================================
// 职责: 将文本/数值数量转换为正整数
// 分隔符规则:
// - 只含数字: 直接按整数解析
// - 同时含 ',' 与 '.': 最后出现者为小数点，另一个视为千分位
// - 只含 ',': 巴西写法，',' 为小数点
// - 只含 '.': 恰好一个且小数位 > 2 时视为千分位，否则为小数点
// 取整: 向上取整（库存数量不存小数）
// ==========================================

use crate::domain::request::RawCell;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};

/// 与纯数字读法相差超过该倍数时告警
const WARNING_FACTOR: f64 = 10.0;

// ==========================================
// QuantityWarning - 数量量级告警
// ==========================================
// 不阻断导入，由导入器写入报告与日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityWarning {
    pub raw: String,
    pub parsed: i64,
    pub digits_only: i64,
}

impl QuantityWarning {
    pub fn message(&self) -> String {
        format!(
            "Quantidade '{}' interpretada como {} (leitura só com dígitos: {})",
            self.raw, self.parsed, self.digits_only
        )
    }
}

// ==========================================
// ParsedQuantity - 解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuantity {
    pub value: i64,      // 向上取整后的值
    pub normalized: f64, // 取整前的值
    pub warning: Option<QuantityWarning>,
}

/// 解析原始数量单元格
///
/// # 返回
/// - Ok(ParsedQuantity): value 可能为 0（是否 > 0 由行校验器判断）
/// - Err(InvalidQuantity): 空值、无法解析、非有限值或负数
pub fn parse_quantity(cell: &RawCell) -> ImportResult<ParsedQuantity> {
    match cell {
        RawCell::Empty => Err(invalid("", "valor vazio")),
        RawCell::Number(n) => {
            let value = ceil_checked(*n, &n.to_string())?;
            Ok(ParsedQuantity {
                value,
                normalized: *n,
                warning: None,
            })
        }
        RawCell::Text(raw) => parse_quantity_text(raw),
    }
}

fn parse_quantity_text(raw: &str) -> ImportResult<ParsedQuantity> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(invalid(raw, "valor vazio"));
    }

    // 纯数字: 原样按整数解析
    if compact.chars().all(|c| c.is_ascii_digit()) {
        let value = compact
            .parse::<i64>()
            .map_err(|e| invalid(raw, &e.to_string()))?;
        return Ok(ParsedQuantity {
            value,
            normalized: value as f64,
            warning: None,
        });
    }

    let normalized = normalize_quantity(&compact)?;
    let value = ceil_checked(normalized, raw)?;
    let warning = magnitude_warning(raw, &compact, value);

    Ok(ParsedQuantity {
        value,
        normalized,
        warning,
    })
}

/// 按分隔符规则规范化为浮点数（取整前）
pub fn normalize_quantity(raw: &str) -> ImportResult<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let text = normalize_separators(&compact);

    let well_formed = !text.is_empty()
        && text.chars().all(|c| c.is_ascii_digit() || c == '.')
        && text.matches('.').count() <= 1
        && text.chars().any(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(invalid(raw, "formato numérico inválido"));
    }

    text.parse::<f64>().map_err(|e| invalid(raw, &e.to_string()))
}

fn normalize_separators(compact: &str) -> String {
    let last_comma = compact.rfind(',');
    let last_dot = compact.rfind('.');

    match (last_comma, last_dot) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                compact.replace('.', "").replace(',', ".")
            } else {
                compact.replace(',', "")
            }
        }
        (Some(_), None) => compact.replace(',', "."),
        (None, Some(dot)) => {
            let single = compact.matches('.').count() == 1;
            let fraction_len = compact[dot + 1..].len();
            if single && fraction_len > 2 {
                compact.replace('.', "")
            } else {
                compact.to_string()
            }
        }
        (None, None) => compact.to_string(),
    }
}

fn ceil_checked(value: f64, raw: &str) -> ImportResult<i64> {
    if !value.is_finite() {
        return Err(invalid(raw, "valor não finito"));
    }
    if value < 0.0 {
        return Err(invalid(raw, "valor negativo"));
    }
    let ceiled = value.ceil();
    if ceiled > i64::MAX as f64 {
        return Err(invalid(raw, "valor fora do intervalo"));
    }
    Ok(ceiled as i64)
}

fn magnitude_warning(raw: &str, compact: &str, parsed: i64) -> Option<QuantityWarning> {
    let digits: String = compact.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits_only = digits.parse::<i64>().ok()?;
    if digits_only <= 0 || parsed <= 0 {
        return None;
    }

    let (a, b) = (parsed as f64, digits_only as f64);
    if a > b * WARNING_FACTOR || b > a * WARNING_FACTOR {
        Some(QuantityWarning {
            raw: raw.trim().to_string(),
            parsed,
            digits_only,
        })
    } else {
        None
    }
}

fn invalid(value: &str, message: &str) -> ImportError {
    ImportError::InvalidQuantity {
        value: value.trim().to_string(),
        message: message.to_string(),
    }
}

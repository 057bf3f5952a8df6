// ==========================================
// 物料申请系统 - 配置值对象
// ==========================================
// 职责: 导入参数 / 可疑数量阈值（带默认值）
// 说明: 阈值来自历史录入错误的经验总结，不是普适算法，全部可配置
// ==========================================

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ==========================================
// CorrectionRounding - 修正值取整方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectionRounding {
    /// 向上取整（与导入时的数量取整一致）
    #[default]
    Ceiling,
    /// 四舍五入（.5 向上）
    Nearest,
}

impl FromStr for CorrectionRounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CEILING" | "CEIL" => Ok(CorrectionRounding::Ceiling),
            "NEAREST" | "ROUND" => Ok(CorrectionRounding::Nearest),
            other => Err(format!("unknown rounding mode: {}", other)),
        }
    }
}

// ==========================================
// SuspicionThresholds - 可疑数量阈值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspicionThresholds {
    pub large_value: i64,              // 规则1: q > large_value
    pub thousand_band_floor: i64,      // 规则2: q > floor
    pub thousand_remainder_limit: i64, // 规则2: q % 1000 < limit
    pub round_hundred_floor: i64,      // 规则3: q >= floor 且 q % 100 == 0
    pub mid_range_floor: i64,          // 规则4: floor < q
    pub mid_range_ceiling: i64,        // 规则4: q < ceiling
    pub correction_divisor: i64,       // 修正: q / divisor
    pub rounding: CorrectionRounding,
}

impl Default for SuspicionThresholds {
    fn default() -> Self {
        Self {
            large_value: 50_000,
            thousand_band_floor: 10_000,
            thousand_remainder_limit: 100,
            round_hundred_floor: 10_000,
            mid_range_floor: 1_000,
            mid_range_ceiling: 1_000_000,
            correction_divisor: 100,
            rounding: CorrectionRounding::Ceiling,
        }
    }
}

// ==========================================
// ImportSettings - 导入与批次参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub max_rows: usize,               // 单次导入行数上限
    pub header_rows: usize,            // 表头行数（行号换算）
    pub material_code_min_len: usize,
    pub material_code_max_len: usize,
    pub preview_rows: usize,           // 仅校验时返回的预览行数
    pub batch_window_hours: i64,       // 批次扫描窗口
    pub retention_days: i64,           // 软删除保留天数
    pub history_actor: String,         // 系统写历史时的操作人
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            header_rows: 1,
            material_code_min_len: 10,
            material_code_max_len: 25,
            preview_rows: 10,
            batch_window_hours: 24,
            retention_days: 45,
            history_actor: "system".to_string(),
        }
    }
}

impl ImportSettings {
    /// 数据行下标（0 起）→ 表格行号（1 起，含表头）
    pub fn row_number(&self, index: usize) -> usize {
        index + self.header_rows + 1
    }
}

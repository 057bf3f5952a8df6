// ==========================================
// 物料申请系统 - 数量修正领域模型
// ==========================================
// 职责: 可疑数量规则 / 置信度 / 修正候选
// 用途: QuantityHeuristic 输出，人工决定“应用 / 忽略”
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// SuspicionRule - 可疑规则
// ==========================================
// 顺序即优先级：命中多条时以第一条作为 reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuspicionRule {
    /// q > 50_000
    ExceedsLargeValue,
    /// q > 10_000 且 q % 1000 < 100
    NearThousandMultiple,
    /// q ≥ 10_000 且 q % 100 == 0
    RoundHundredLarge,
    /// 1_000 < q < 1_000_000 且 q % 100 == 0
    RoundHundredMidRange,
}

impl SuspicionRule {
    pub fn code(&self) -> &'static str {
        match self {
            SuspicionRule::ExceedsLargeValue => "EXCEEDS_LARGE_VALUE",
            SuspicionRule::NearThousandMultiple => "NEAR_THOUSAND_MULTIPLE",
            SuspicionRule::RoundHundredLarge => "ROUND_HUNDRED_LARGE",
            SuspicionRule::RoundHundredMidRange => "ROUND_HUNDRED_MID_RANGE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SuspicionRule::ExceedsLargeValue => "valor muito grande",
            SuspicionRule::NearThousandMultiple => "próximo de múltiplo de 1000",
            SuspicionRule::RoundHundredLarge => "termina em 00 com 5+ dígitos",
            SuspicionRule::RoundHundredMidRange => "múltiplo de 100 na faixa intermediária",
        }
    }
}

impl fmt::Display for SuspicionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ==========================================
// Confidence - 置信度标签
// ==========================================
// 按命中规则条数分级（3+ High / 2 Medium / 1 Low）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_match_count(count: usize) -> Self {
        match count {
            0 | 1 => Confidence::Low,
            2 => Confidence::Medium,
            _ => Confidence::High,
        }
    }
}

// ==========================================
// CorrectionCandidate - 修正候选
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionCandidate {
    pub id: i64,
    pub original_quantity: i64,
    pub suggested_quantity: i64,
    pub rule: SuspicionRule,
    pub matched_rules: Vec<SuspicionRule>,
    pub confidence: Confidence,
    pub reason: String,
    pub material_code: String,
    pub material_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_match_count() {
        assert_eq!(Confidence::from_match_count(1), Confidence::Low);
        assert_eq!(Confidence::from_match_count(2), Confidence::Medium);
        assert_eq!(Confidence::from_match_count(4), Confidence::High);
    }

    #[test]
    fn test_rule_serializes_as_code() {
        let json = serde_json::to_string(&SuspicionRule::NearThousandMultiple).unwrap();
        assert_eq!(json, format!("\"{}\"", SuspicionRule::NearThousandMultiple.code()));
    }
}

// ==========================================
// 物料申请系统 - 可疑数量判定引擎
// ==========================================
// 红线: 判定只读，不写库；所有命中必须输出 reason
// 背景: 表格中的 "890,22" 曾被读成 89022（×100 放大）
// 说明: 阈值为经验值，来自历史录入错误，存在误报/漏报
// ==========================================
// 规则（任一命中即可疑）:
// 1) q > large_value
// 2) q > thousand_band_floor 且 q % 1000 < thousand_remainder_limit
// 3) q ≥ round_hundred_floor 且 q % 100 == 0
// 4) mid_range_floor < q < mid_range_ceiling 且 q % 100 == 0
// 修正: q / correction_divisor，按配置取整；结果 < 1 视为不可疑
// ==========================================

use crate::config::{CorrectionRounding, SuspicionThresholds};
use crate::domain::correction::{Confidence, CorrectionCandidate, SuspicionRule};
use crate::domain::request::MaterialRequest;
use crate::engine::error::{CorrectionError, CorrectionResult};

// ==========================================
// QuantityHeuristic - 可疑数量判定
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct QuantityHeuristic {
    thresholds: SuspicionThresholds,
}

impl QuantityHeuristic {
    pub fn new(thresholds: SuspicionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SuspicionThresholds {
        &self.thresholds
    }

    /// 返回命中的全部规则（按优先级）
    pub fn classify(&self, quantity: i64) -> Vec<SuspicionRule> {
        let t = &self.thresholds;
        let mut rules = Vec::new();

        if quantity > t.large_value {
            rules.push(SuspicionRule::ExceedsLargeValue);
        }
        if quantity > t.thousand_band_floor && quantity % 1000 < t.thousand_remainder_limit {
            rules.push(SuspicionRule::NearThousandMultiple);
        }
        if quantity >= t.round_hundred_floor && quantity % 100 == 0 {
            rules.push(SuspicionRule::RoundHundredLarge);
        }
        if quantity > t.mid_range_floor && quantity < t.mid_range_ceiling && quantity % 100 == 0 {
            rules.push(SuspicionRule::RoundHundredMidRange);
        }

        rules
    }

    /// 计算修正值
    ///
    /// # 返回
    /// - Err(CorrectionNotApplicable): 修正后 < 1
    pub fn suggest_correction(&self, quantity: i64) -> CorrectionResult<i64> {
        let divisor = self.thresholds.correction_divisor.max(1);
        let suggested = if quantity <= 0 {
            0
        } else {
            // 先除再补余数，i64::MAX 也不溢出
            let (whole, remainder) = (quantity / divisor, quantity % divisor);
            match self.thresholds.rounding {
                CorrectionRounding::Ceiling => whole + i64::from(remainder != 0),
                CorrectionRounding::Nearest => whole + i64::from(remainder >= (divisor + 1) / 2),
            }
        };

        if suggested < 1 {
            return Err(CorrectionError::CorrectionNotApplicable {
                quantity,
                suggested,
            });
        }
        Ok(suggested)
    }

    /// 是否可疑（命中规则且修正值可用）
    pub fn is_suspicious(&self, quantity: i64) -> bool {
        !self.classify(quantity).is_empty() && self.suggest_correction(quantity).is_ok()
    }

    /// 评估单条申请
    ///
    /// 返回 None: 未命中规则，或修正不适用
    pub fn evaluate(&self, request: &MaterialRequest) -> Option<CorrectionCandidate> {
        let matched_rules = self.classify(request.quantity);
        let rule = *matched_rules.first()?;
        let suggested_quantity = self.suggest_correction(request.quantity).ok()?;

        let reason = format!(
            "Quantidade {} suspeita ({}): sugerido {}",
            request.quantity,
            rule.description(),
            suggested_quantity
        );

        Some(CorrectionCandidate {
            id: request.id,
            original_quantity: request.quantity,
            suggested_quantity,
            rule,
            confidence: Confidence::from_match_count(matched_rules.len()),
            matched_rules,
            reason,
            material_code: request.material_code.clone(),
            material_description: request.material_description.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{RequestStatus, Unit, Urgency};
    use chrono::Utc;

    fn heuristic() -> QuantityHeuristic {
        QuantityHeuristic::default()
    }

    fn request(id: i64, quantity: i64) -> MaterialRequest {
        MaterialRequest {
            id,
            material_code: "1234567890".to_string(),
            material_description: "Chapa de aço".to_string(),
            quantity,
            unit: Unit::Kg,
            requester_name: "Ana".to_string(),
            urgency: Urgency::Normal,
            status: RequestStatus::Pending,
            deadline: None,
            justification: None,
            import_batch_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_known_values() {
        let h = heuristic();
        assert!(h.is_suspicious(89022));
        assert_eq!(h.suggest_correction(89022).unwrap(), 891);

        assert!(!h.is_suspicious(250));

        assert!(h.is_suspicious(100000));
        assert_eq!(h.suggest_correction(100000).unwrap(), 1000);

        assert!(h.is_suspicious(155564));
        assert_eq!(h.suggest_correction(155564).unwrap(), 1556);
    }

    #[test]
    fn test_each_rule_boundary() {
        let h = heuristic();
        assert_eq!(h.classify(50_150), vec![SuspicionRule::ExceedsLargeValue]);
        assert!(h.classify(50_000).contains(&SuspicionRule::RoundHundredLarge));
        assert!(!h.classify(50_000).contains(&SuspicionRule::ExceedsLargeValue));

        assert!(h.classify(10_099).contains(&SuspicionRule::NearThousandMultiple));
        assert!(!h.classify(10_000).contains(&SuspicionRule::NearThousandMultiple));
        assert!(!h.classify(10_100).contains(&SuspicionRule::NearThousandMultiple));

        assert!(h.classify(10_000).contains(&SuspicionRule::RoundHundredLarge));
        assert_eq!(h.classify(1_100), vec![SuspicionRule::RoundHundredMidRange]);
        assert!(h.classify(1_000).is_empty());
        assert!(h.classify(999).is_empty());
    }

    #[test]
    fn test_corrected_values_are_not_flagged_again() {
        let h = heuristic();
        for quantity in [89022, 155564, 100000, 54321, 12000] {
            let corrected = h.suggest_correction(quantity).unwrap();
            assert!(!h.is_suspicious(corrected), "{quantity} → {corrected}");
        }
    }

    #[test]
    fn test_nearest_rounding_mode() {
        let h = QuantityHeuristic::new(SuspicionThresholds {
            rounding: CorrectionRounding::Nearest,
            ..SuspicionThresholds::default()
        });
        assert_eq!(h.suggest_correction(89022).unwrap(), 890);
        assert_eq!(h.suggest_correction(89050).unwrap(), 891);
    }

    #[test]
    fn test_extreme_quantity_does_not_overflow() {
        let h = heuristic();
        assert!(h.is_suspicious(i64::MAX));
        assert_eq!(h.suggest_correction(i64::MAX).unwrap(), i64::MAX / 100 + 1);

        let nearest = QuantityHeuristic::new(SuspicionThresholds {
            rounding: CorrectionRounding::Nearest,
            ..SuspicionThresholds::default()
        });
        assert_eq!(nearest.suggest_correction(i64::MAX).unwrap(), i64::MAX / 100);
        assert!(nearest.evaluate(&request(1, i64::MAX)).is_some());
    }

    #[test]
    fn test_degenerate_correction_is_withheld() {
        let h = QuantityHeuristic::new(SuspicionThresholds {
            large_value: 10,
            rounding: CorrectionRounding::Nearest,
            ..SuspicionThresholds::default()
        });
        assert!(!h.classify(40).is_empty());
        assert!(matches!(
            h.suggest_correction(40),
            Err(CorrectionError::CorrectionNotApplicable { quantity: 40, suggested: 0 })
        ));
        assert!(!h.is_suspicious(40));
        assert!(h.evaluate(&request(1, 40)).is_none());
    }

    #[test]
    fn test_evaluate_builds_candidate() {
        let candidate = heuristic().evaluate(&request(7, 100000)).unwrap();
        assert_eq!(candidate.id, 7);
        assert_eq!(candidate.suggested_quantity, 1000);
        assert_eq!(candidate.rule, SuspicionRule::ExceedsLargeValue);
        assert_eq!(candidate.matched_rules.len(), 4);
        assert_eq!(candidate.confidence, Confidence::High);
        assert!(candidate.reason.contains("100000"));

        let candidate = heuristic().evaluate(&request(8, 89022)).unwrap();
        assert_eq!(candidate.confidence, Confidence::Medium);

        assert!(heuristic().evaluate(&request(9, 250)).is_none());
    }
}

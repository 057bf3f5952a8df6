// ==========================================
// 物料申请系统 - 导入行校验器
// ==========================================
// 职责: 单行字段校验 + 规范化
// 红线: 错误全部收集，不短路；单行失败不影响其余行
// 消息格式: "Linha {n}: ..."（n 为含表头的 1 起行号）
// ==========================================

use crate::config::ImportSettings;
use crate::domain::request::{ImportRow, NewMaterialRequest};
use crate::domain::types::{RequestStatus, Unit, Urgency};
use crate::importer::date_parser::DateParser;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{FieldMapper, RequestField};
use crate::importer::quantity_parser::{parse_quantity, QuantityWarning};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ValidatedRow - 规范化后的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRow {
    pub row_number: usize,
    pub material_code: String,
    pub material_description: String,
    pub quantity: i64,
    pub unit: Unit,
    pub requester_name: String,
    pub urgency: Urgency,
    pub deadline: NaiveDate,
    pub justification: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<QuantityWarning>,
}

impl ValidatedRow {
    /// 转为待插入申请（状态固定为 Pendente）
    pub fn into_new_request(
        self,
        import_batch_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> NewMaterialRequest {
        NewMaterialRequest {
            material_code: self.material_code,
            material_description: self.material_description,
            quantity: self.quantity,
            unit: self.unit,
            requester_name: self.requester_name,
            urgency: self.urgency,
            status: RequestStatus::Pending,
            deadline: self.deadline,
            justification: self.justification,
            import_batch_id,
            created_at,
        }
    }
}

// ==========================================
// RowValidator
// ==========================================
pub struct RowValidator {
    mapper: FieldMapper,
    date_parser: DateParser,
    code_min_len: usize,
    code_max_len: usize,
}

impl RowValidator {
    pub fn new(settings: &ImportSettings, date_parser: DateParser) -> Self {
        Self {
            mapper: FieldMapper,
            date_parser,
            code_min_len: settings.material_code_min_len,
            code_max_len: settings.material_code_max_len,
        }
    }

    /// 校验单行，返回全部错误（空 = 合法）
    pub fn validate(&self, row: &ImportRow, row_number: usize) -> Vec<String> {
        match self.normalize(row, row_number) {
            Ok(_) => Vec::new(),
            Err(ImportError::RowValidationFailed { errors, .. }) => errors,
            Err(other) => vec![format!("Linha {}: {}", row_number, other)],
        }
    }

    /// 校验并规范化单行
    ///
    /// # 返回
    /// - Err(RowValidationFailed): 携带该行全部字段错误
    pub fn normalize(&self, row: &ImportRow, row_number: usize) -> ImportResult<ValidatedRow> {
        let mut errors = Vec::new();
        let mut push = |message: String| errors.push(format!("Linha {}: {}", row_number, message));

        // ----- 物料编码 -----
        let material_code = match self.mapper.text(row, RequestField::Material) {
            None => {
                push("Código do material é obrigatório".to_string());
                None
            }
            Some(code) if !code.chars().all(|c| c.is_ascii_digit() || c == '-') => {
                push("Código do material deve conter apenas números e hífens".to_string());
                None
            }
            Some(code) => {
                let len = code.chars().count();
                if len < self.code_min_len || len > self.code_max_len {
                    push(format!(
                        "Código do material deve ter entre {} e {} caracteres",
                        self.code_min_len, self.code_max_len
                    ));
                    None
                } else {
                    Some(code)
                }
            }
        };

        // ----- 描述 -----
        let material_description = self.mapper.text(row, RequestField::Descricao);
        if material_description.is_none() {
            push("Descrição é obrigatória".to_string());
        }

        // ----- 数量 -----
        let mut warnings = Vec::new();
        let quantity = match self.mapper.lookup(row, RequestField::Quantidade) {
            Some(cell) if !cell.is_blank() => match parse_quantity(cell) {
                Ok(parsed) if parsed.value > 0 => {
                    warnings.extend(parsed.warning);
                    Some(parsed.value)
                }
                Ok(_) => {
                    push("Quantidade deve ser maior que zero".to_string());
                    None
                }
                Err(_) => {
                    push("Quantidade deve ser um número válido".to_string());
                    None
                }
            },
            _ => {
                push("Quantidade é obrigatória".to_string());
                None
            }
        };

        // ----- 单位 -----
        let unit = match self.mapper.text(row, RequestField::Unidade) {
            None => {
                push("Unidade é obrigatória".to_string());
                None
            }
            Some(raw) => match raw.parse::<Unit>() {
                Ok(unit) => Some(unit),
                Err(_) => {
                    push("Unidade deve ser kg, pc ou m".to_string());
                    None
                }
            },
        };

        // ----- 申请人 -----
        let requester_name = self.mapper.text(row, RequestField::Solicitante);
        if requester_name.is_none() {
            push("Solicitante é obrigatório".to_string());
        }

        // ----- 紧急程度（可选） -----
        let urgency = match self.mapper.text(row, RequestField::Urgencia) {
            None => Urgency::default(),
            Some(raw) => raw.parse::<Urgency>().unwrap_or_else(|_| {
                push("Urgência deve ser \"Urgente\" ou \"Normal\"".to_string());
                Urgency::default()
            }),
        };

        // ----- 期限 -----
        let deadline = self
            .mapper
            .lookup(row, RequestField::Prazo)
            .filter(|cell| !cell.is_blank())
            .and_then(|cell| self.date_parser.parse(cell).ok());
        if deadline.is_none() {
            push(
                "Prazo é obrigatório e deve estar no formato dd/mm/yyyy ou dd/mmm \
                 (ex: 20/10/2025 ou 20/out)"
                    .to_string(),
            );
        }

        let justification = self.mapper.text(row, RequestField::Justificativa);

        match (
            material_code,
            material_description,
            quantity,
            unit,
            requester_name,
            deadline,
        ) {
            (
                Some(material_code),
                Some(material_description),
                Some(quantity),
                Some(unit),
                Some(requester_name),
                Some(deadline),
            ) if errors.is_empty() => Ok(ValidatedRow {
                row_number,
                material_code,
                material_description,
                quantity,
                unit,
                requester_name,
                urgency,
                deadline,
                justification,
                warnings,
            }),
            _ => Err(ImportError::RowValidationFailed { row_number, errors }),
        }
    }
}

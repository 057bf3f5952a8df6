// ==========================================
// 物料申请系统 - 字段映射器
// ==========================================
// 职责: 表头列名 → 标准字段（大小写、重音不敏感）
// 例: "Descrição" / "Descricao" / "descrição" / "DESCRICAO" 均映射到 Descricao
// ==========================================

use crate::domain::request::{ImportRow, RawCell};

// ==========================================
// RequestField - 导入标准字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestField {
    Material,
    Descricao,
    Quantidade,
    Unidade,
    Solicitante,
    Urgencia,
    Prazo,
    Justificativa,
}

impl RequestField {
    /// 模板表头顺序
    pub const ALL: [RequestField; 8] = [
        RequestField::Material,
        RequestField::Descricao,
        RequestField::Quantidade,
        RequestField::Unidade,
        RequestField::Solicitante,
        RequestField::Urgencia,
        RequestField::Prazo,
        RequestField::Justificativa,
    ];

    /// 标准表头（模板使用）
    pub fn header(&self) -> &'static str {
        match self {
            RequestField::Material => "Material",
            RequestField::Descricao => "Descrição",
            RequestField::Quantidade => "Quantidade",
            RequestField::Unidade => "Unidade",
            RequestField::Solicitante => "Solicitante",
            RequestField::Urgencia => "Urgencia",
            RequestField::Prazo => "Prazo",
            RequestField::Justificativa => "Justificativa",
        }
    }

    /// 折叠后的可接受列名
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            RequestField::Material => &["material", "codigo do material", "material_code"],
            RequestField::Descricao => &["descricao", "descricao do material", "material_description"],
            RequestField::Quantidade => &["quantidade", "qtd", "qtde"],
            RequestField::Unidade => &["unidade", "un"],
            RequestField::Solicitante => &["solicitante", "requester_name"],
            RequestField::Urgencia => &["urgencia"],
            RequestField::Prazo => &["prazo", "deadline"],
            RequestField::Justificativa => &["justificativa"],
        }
    }

    /// 列名是否属于该字段
    pub fn matches(&self, column: &str) -> bool {
        let folded = fold_column_name(column);
        self.aliases().iter().any(|alias| *alias == folded)
    }
}

/// 列名折叠: 去首尾空白、小写、去除葡萄牙语重音
pub fn fold_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

// ==========================================
// FieldMapper
// ==========================================
pub struct FieldMapper;

impl FieldMapper {
    /// 查找字段对应的单元格
    ///
    /// 多个列都映射到同一字段时，优先非空值，再按列名排序取第一个
    pub fn lookup<'a>(&self, row: &'a ImportRow, field: RequestField) -> Option<&'a RawCell> {
        let mut candidates: Vec<(&String, &RawCell)> = row
            .columns()
            .filter(|(column, _)| field.matches(column))
            .collect();
        candidates.sort_by(|(a_col, a_cell), (b_col, b_cell)| {
            a_cell
                .is_blank()
                .cmp(&b_cell.is_blank())
                .then_with(|| a_col.cmp(b_col))
        });
        candidates.first().map(|(_, cell)| *cell)
    }

    /// 查找字段并转为去空白文本（空值返回 None）
    pub fn text(&self, row: &ImportRow, field: RequestField) -> Option<String> {
        self.lookup(row, field).and_then(RawCell::as_text)
    }
}

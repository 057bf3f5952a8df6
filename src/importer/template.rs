// ==========================================
// 物料申请系统 - 导入模板
// ==========================================
// 职责: 生成带标准表头与示例行的 CSV 模板
// 约束: 示例行本身必须能通过行校验
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::field_mapper::RequestField;
use csv::Writer;
use std::io::Write;
use std::path::Path;

/// 示例行（列顺序与 RequestField::ALL 一致）
const EXAMPLE_ROWS: [[&str; 8]; 2] = [
    [
        "1000200030",
        "Matéria-Prima X123 - Aço inoxidável",
        "100",
        "kg",
        "João Silva",
        "Normal",
        "20/10/2025",
        "Exemplo de justificativa",
    ],
    [
        "2000-3000-4000",
        "Componente Y456 - Parafuso M8x20",
        "250",
        "pc",
        "Maria Santos",
        "Urgente",
        "14/out",
        "Produção urgente",
    ],
];

/// 写出模板到任意 writer
pub fn write_template<W: Write>(writer: W) -> ImportResult<()> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record(RequestField::ALL.iter().map(RequestField::header))?;
    for row in EXAMPLE_ROWS {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// 写出模板文件
pub fn write_template_file(path: &Path) -> ImportResult<()> {
    let file = std::fs::File::create(path)?;
    write_template(file)?;
    tracing::info!(path = %path.display(), "导入模板已生成");
    Ok(())
}

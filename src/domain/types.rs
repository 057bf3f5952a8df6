// ==========================================
// 物料申请系统 - 领域类型定义
// ==========================================
// 职责: 单位 / 紧急程度 / 申请状态 / 历史动作
// 序列化格式: 与数据库存储值一致（葡萄牙语原文）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 计量单位 (Unidade)
// ==========================================
// 导入时大小写不敏感，落库统一为小写
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg, // 千克
    Pc, // 件
    M,  // 米
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::Pc => "pc",
            Unit::M => "m",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" => Ok(Unit::Kg),
            "pc" => Ok(Unit::Pc),
            "m" => Ok(Unit::M),
            other => Err(format!("unidade desconhecida: {}", other)),
        }
    }
}

// ==========================================
// 紧急程度 (Urgência)
// ==========================================
// 大小写敏感: 只接受 "Normal" / "Urgente"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Urgency {
    #[default]
    Normal,
    Urgente,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "Normal",
            Urgency::Urgente => "Urgente",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Normal" => Ok(Urgency::Normal),
            "Urgente" => Ok(Urgency::Urgente),
            other => Err(format!("urgência desconhecida: {}", other)),
        }
    }
}

// ==========================================
// 申请状态 (Status)
// ==========================================
// 状态之间没有强制的状态机，任何合法值都可以直接写入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    #[serde(rename = "Pendente")]
    Pending,
    #[serde(rename = "Em Separação")]
    Picking,
    #[serde(rename = "Concluído")]
    Completed,
    #[serde(rename = "Cancelado")]
    Cancelled,
    #[serde(rename = "Recusado")]
    Refused,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::Picking,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
        RequestStatus::Refused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pendente",
            RequestStatus::Picking => "Em Separação",
            RequestStatus::Completed => "Concluído",
            RequestStatus::Cancelled => "Cancelado",
            RequestStatus::Refused => "Recusado",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        RequestStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == trimmed)
            .ok_or_else(|| format!("status inválido: {}", trimmed))
    }
}

// ==========================================
// 历史动作 (request_history.acao)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Criado,    // 导入/新建
    Corrigido, // 数量修正
    Excluido,  // 软删除
    #[serde(rename = "status_mudado")]
    StatusMudado, // 状态变更
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Criado => "criado",
            HistoryAction::Corrigido => "corrigido",
            HistoryAction::Excluido => "excluido",
            HistoryAction::StatusMudado => "status_mudado",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "criado" => Ok(HistoryAction::Criado),
            "corrigido" => Ok(HistoryAction::Corrigido),
            "excluido" => Ok(HistoryAction::Excluido),
            "status_mudado" => Ok(HistoryAction::StatusMudado),
            other => Err(format!("ação desconhecida: {}", other)),
        }
    }
}

// ==========================================
// 物料申请系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)，缺失键使用默认值
// ==========================================

use crate::config::import_config_trait::{ConfigError, ConfigResult, ImportConfigReader};
use crate::config::settings::{CorrectionRounding, ImportSettings, SuspicionThresholds};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入/覆盖 global 配置
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置；格式错误时告警并回退默认值
    fn get_parsed<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Display,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(
                        config_key = key,
                        raw_value = %raw,
                        default = %default,
                        "配置值格式错误，使用默认值"
                    );
                    Ok(default)
                }
            },
        }
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_import_settings(&self) -> ConfigResult<ImportSettings> {
        let defaults = ImportSettings::default();

        let history_actor = self
            .get_global_config_value(config_keys::HISTORY_ACTOR)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.history_actor);

        Ok(ImportSettings {
            max_rows: self.get_parsed(config_keys::IMPORT_MAX_ROWS, defaults.max_rows)?,
            header_rows: self.get_parsed(config_keys::IMPORT_HEADER_ROWS, defaults.header_rows)?,
            material_code_min_len: self
                .get_parsed(config_keys::MATERIAL_CODE_MIN_LEN, defaults.material_code_min_len)?,
            material_code_max_len: self
                .get_parsed(config_keys::MATERIAL_CODE_MAX_LEN, defaults.material_code_max_len)?,
            preview_rows: self.get_parsed(config_keys::IMPORT_PREVIEW_ROWS, defaults.preview_rows)?,
            batch_window_hours: self
                .get_parsed(config_keys::BATCH_WINDOW_HOURS, defaults.batch_window_hours)?,
            retention_days: self.get_parsed(config_keys::RETENTION_DAYS, defaults.retention_days)?,
            history_actor,
        })
    }

    async fn get_suspicion_thresholds(&self) -> ConfigResult<SuspicionThresholds> {
        let d = SuspicionThresholds::default();

        let rounding = match self.get_global_config_value(config_keys::CORRECTION_ROUNDING)? {
            None => d.rounding,
            Some(raw) => raw.parse::<CorrectionRounding>().unwrap_or_else(|_| {
                tracing::warn!(
                    config_key = config_keys::CORRECTION_ROUNDING,
                    raw_value = %raw,
                    "取整方式配置错误，使用 CEILING"
                );
                d.rounding
            }),
        };

        let mut divisor = self.get_parsed(config_keys::CORRECTION_DIVISOR, d.correction_divisor)?;
        if divisor <= 0 {
            tracing::warn!(divisor, "修正除数必须为正数，使用默认值");
            divisor = d.correction_divisor;
        }

        Ok(SuspicionThresholds {
            large_value: self.get_parsed(config_keys::SUSPICION_LARGE_VALUE, d.large_value)?,
            thousand_band_floor: self
                .get_parsed(config_keys::SUSPICION_THOUSAND_FLOOR, d.thousand_band_floor)?,
            thousand_remainder_limit: self.get_parsed(
                config_keys::SUSPICION_THOUSAND_REMAINDER,
                d.thousand_remainder_limit,
            )?,
            round_hundred_floor: self
                .get_parsed(config_keys::SUSPICION_ROUND_HUNDRED_FLOOR, d.round_hundred_floor)?,
            mid_range_floor: self.get_parsed(config_keys::SUSPICION_MID_FLOOR, d.mid_range_floor)?,
            mid_range_ceiling: self
                .get_parsed(config_keys::SUSPICION_MID_CEILING, d.mid_range_ceiling)?,
            correction_divisor: divisor,
            rounding,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入
    pub const IMPORT_MAX_ROWS: &str = "import_max_rows";
    pub const IMPORT_HEADER_ROWS: &str = "import_header_rows";
    pub const IMPORT_PREVIEW_ROWS: &str = "import_preview_rows";
    pub const MATERIAL_CODE_MIN_LEN: &str = "material_code_min_len";
    pub const MATERIAL_CODE_MAX_LEN: &str = "material_code_max_len";

    // 批次与保留
    pub const BATCH_WINDOW_HOURS: &str = "batch_window_hours";
    pub const RETENTION_DAYS: &str = "retention_days";
    pub const HISTORY_ACTOR: &str = "history_actor";

    // 可疑数量启发式
    pub const SUSPICION_LARGE_VALUE: &str = "suspicion_large_value";
    pub const SUSPICION_THOUSAND_FLOOR: &str = "suspicion_thousand_floor";
    pub const SUSPICION_THOUSAND_REMAINDER: &str = "suspicion_thousand_remainder";
    pub const SUSPICION_ROUND_HUNDRED_FLOOR: &str = "suspicion_round_hundred_floor";
    pub const SUSPICION_MID_FLOOR: &str = "suspicion_mid_floor";
    pub const SUSPICION_MID_CEILING: &str = "suspicion_mid_ceiling";
    pub const CORRECTION_DIVISOR: &str = "correction_divisor";
    pub const CORRECTION_ROUNDING: &str = "correction_rounding";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn manager() -> (NamedTempFile, ConfigManager) {
        let file = NamedTempFile::new().unwrap();
        let conn = crate::db::open_sqlite_connection(file.path().to_str().unwrap()).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap();
        (file, manager)
    }

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let (_file, manager) = manager();
        assert_eq!(manager.get_import_settings().await.unwrap(), ImportSettings::default());
        assert_eq!(
            manager.get_suspicion_thresholds().await.unwrap(),
            SuspicionThresholds::default()
        );
    }

    #[tokio::test]
    async fn test_overrides_are_applied() {
        let (_file, manager) = manager();
        manager.set_global_config_value(config_keys::IMPORT_MAX_ROWS, "50").unwrap();
        manager.set_global_config_value(config_keys::SUSPICION_LARGE_VALUE, "80000").unwrap();
        manager.set_global_config_value(config_keys::CORRECTION_ROUNDING, "NEAREST").unwrap();

        let settings = manager.get_import_settings().await.unwrap();
        assert_eq!(settings.max_rows, 50);

        let thresholds = manager.get_suspicion_thresholds().await.unwrap();
        assert_eq!(thresholds.large_value, 80_000);
        assert_eq!(thresholds.rounding, CorrectionRounding::Nearest);
    }

    #[tokio::test]
    async fn test_malformed_values_fall_back_to_defaults() {
        let (_file, manager) = manager();
        manager.set_global_config_value(config_keys::RETENTION_DAYS, "quarenta").unwrap();
        manager.set_global_config_value(config_keys::CORRECTION_DIVISOR, "0").unwrap();

        let settings = manager.get_import_settings().await.unwrap();
        assert_eq!(settings.retention_days, 45);

        let thresholds = manager.get_suspicion_thresholds().await.unwrap();
        assert_eq!(thresholds.correction_divisor, 100);
    }

    #[test]
    fn test_snapshot_lists_global_keys() {
        let (_file, manager) = manager();
        manager.set_global_config_value("b_key", "2").unwrap();
        manager.set_global_config_value("a_key", "1").unwrap();

        let snapshot = manager.get_config_snapshot().unwrap();
        let keys: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(keys, vec!["a_key".to_string(), "b_key".to_string()]);
    }
}

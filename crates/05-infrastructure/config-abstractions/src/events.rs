//! 配置变更事件定义

use crate::snapshot::{fold_key, ConfigurationSnapshot, KEY_DELIMITER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 配置变更事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigChangeEvent {
    /// 新快照代数
    pub generation: u64,
    /// 旧快照代数
    pub previous_generation: u64,
    /// 新增、删除或修改的键
    pub changed_keys: Vec<String>,
    /// 事件来源（配置文件路径）
    pub source: String,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
}

impl ConfigChangeEvent {
    /// 根据新旧快照创建变更事件
    pub fn between(
        previous: &ConfigurationSnapshot,
        current: &ConfigurationSnapshot,
        source: impl Into<String>,
    ) -> Self {
        Self {
            generation: current.generation(),
            previous_generation: previous.generation(),
            changed_keys: current.changed_keys(previous),
            source: source.into(),
            timestamp: Utc::now(),
        }
    }

    /// 变更是否涉及指定配置节（不区分大小写）
    pub fn touches_section(&self, section: &str) -> bool {
        let prefix = format!("{}{}", fold_key(section), KEY_DELIMITER);
        self.changed_keys
            .iter()
            .any(|key| fold_key(key).starts_with(&prefix))
    }
}

/// 快照变更观察者
///
/// 每次重新加载产生变更后，按重新加载的顺序被调用。
pub trait SnapshotObserver: Send + Sync {
    /// 快照已替换
    fn on_snapshot_changed(&self, event: &ConfigChangeEvent, snapshot: &Arc<ConfigurationSnapshot>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_reports_touched_sections() {
        let before = ConfigurationSnapshot::from_pairs(1, [("Sample.Value1", json!("asd"))]);
        let after = ConfigurationSnapshot::from_pairs(2, [("Sample.Value1", json!("zxc"))]);

        let event = ConfigChangeEvent::between(&before, &after, "appsettings.json");
        assert_eq!(event.generation, 2);
        assert_eq!(event.previous_generation, 1);
        assert!(event.touches_section("sample"));
        assert!(!event.touches_section("Samp"));
        assert!(!event.touches_section("Other"));
    }

    #[test]
    fn touched_sections_fold_non_ascii_case() {
        let before = ConfigurationSnapshot::from_pairs(1, [("Übersicht.Titel", json!("a"))]);
        let after = ConfigurationSnapshot::from_pairs(2, [("Übersicht.Titel", json!("b"))]);

        let event = ConfigChangeEvent::between(&before, &after, "appsettings.json");
        assert!(event.touches_section("übersicht"));
        assert!(event.touches_section("ÜBERSICHT"));
        assert_eq!(
            after.section("übersicht").get("titel"),
            Some(&json!("b"))
        );
    }
}

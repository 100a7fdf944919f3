//! 配置快照
//!
//! 嵌套的配置树被扁平化为 `Section.Field` 形式的点分键，键保留原始大小写，
//! 查找时不区分大小写。快照创建后不可修改，重新加载时整体替换。

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// 键分隔符
pub const KEY_DELIMITER: char = '.';

/// 配置键的大小写折叠，所有不区分大小写的键比较都使用此规则
pub fn fold_key(key: &str) -> String {
    key.to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    key: String,
    value: Value,
}

/// 配置快照
#[derive(Debug, Clone)]
pub struct ConfigurationSnapshot {
    generation: u64,
    loaded_at: DateTime<Utc>,
    /// 小写键 -> 原始键和值
    entries: BTreeMap<String, Entry>,
}

impl ConfigurationSnapshot {
    /// 创建空快照
    pub fn empty(generation: u64) -> Self {
        Self {
            generation,
            loaded_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    /// 从嵌套配置树创建快照
    ///
    /// 对象逐层展开为点分键，标量和数组作为叶子值；根节点不是对象时得到空快照。
    pub fn from_tree(generation: u64, tree: &Value) -> Self {
        let mut snapshot = Self::empty(generation);
        flatten("", tree, &mut snapshot.entries);
        snapshot
    }

    /// 从扁平键值对创建快照
    pub fn from_pairs<K, I>(generation: u64, pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut snapshot = Self::empty(generation);
        for (key, value) in pairs {
            insert(&mut snapshot.entries, key.into(), value);
        }
        snapshot
    }

    /// 以新的代数复制快照内容
    #[must_use]
    pub fn with_generation(&self, generation: u64) -> Self {
        Self {
            generation,
            loaded_at: Utc::now(),
            entries: self.entries.clone(),
        }
    }

    /// 快照代数
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 加载时间
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// 配置项数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按点分键取值（不区分大小写）
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .get(&fold_key(key))
            .map(|entry| &entry.value)
    }

    /// 检查键是否存在
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&fold_key(key))
    }

    /// 遍历所有配置项（原始大小写的键）
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .values()
            .map(|entry| (entry.key.as_str(), &entry.value))
    }

    /// 获取配置节视图
    pub fn section(&self, name: &str) -> ConfigSection<'_> {
        ConfigSection {
            snapshot: self,
            name: name.to_string(),
            prefix: format!("{}{}", fold_key(name), KEY_DELIMITER),
        }
    }

    /// 内容是否相同（忽略代数和加载时间）
    pub fn same_content(&self, other: &Self) -> bool {
        self.entries == other.entries
    }

    /// 与先前快照相比新增、删除或修改的键
    pub fn changed_keys(&self, previous: &Self) -> Vec<String> {
        let mut changed: Vec<String> = self
            .entries
            .iter()
            .filter(|(lower, entry)| previous.entries.get(*lower) != Some(*entry))
            .map(|(_, entry)| entry.key.clone())
            .collect();
        changed.extend(
            previous
                .entries
                .iter()
                .filter(|(lower, _)| !self.entries.contains_key(*lower))
                .map(|(_, entry)| entry.key.clone()),
        );
        changed.sort();
        changed
    }
}

fn flatten(prefix: &str, value: &Value, entries: &mut BTreeMap<String, Entry>) {
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}{KEY_DELIMITER}{name}")
                };
                flatten(&key, child, entries);
            }
        }
        leaf if !prefix.is_empty() => insert(entries, prefix.to_string(), leaf.clone()),
        _ => {}
    }
}

fn insert(entries: &mut BTreeMap<String, Entry>, key: String, value: Value) {
    entries.insert(fold_key(&key), Entry { key, value });
}

/// 配置节视图
#[derive(Debug, Clone)]
pub struct ConfigSection<'a> {
    snapshot: &'a ConfigurationSnapshot,
    name: String,
    prefix: String,
}

impl<'a> ConfigSection<'a> {
    /// 配置节名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 配置节是否存在任何配置项
    pub fn exists(&self) -> bool {
        self.entries().next().is_some()
    }

    /// 按字段名取值（不区分大小写）
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.snapshot
            .entries
            .get(&format!("{}{}", self.prefix, fold_key(field)))
            .map(|entry| &entry.value)
    }

    /// 遍历配置节下的配置项，返回去掉节前缀后的键
    pub fn entries(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + '_ {
        let prefix_len = self.prefix.len();
        self.snapshot
            .entries
            .range(self.prefix.clone()..)
            .take_while(move |(lower, _)| lower.starts_with(&self.prefix))
            .map(move |(_, entry)| (&entry.key[prefix_len..], &entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_tree_is_flattened() {
        let snapshot = ConfigurationSnapshot::from_tree(
            1,
            &json!({
                "Sample": {"Value1": "asd", "Value4": ["a", "b"], "Inner": {"Depth": 2}},
                "Other": true
            }),
        );

        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.get("sample.value1"), Some(&json!("asd")));
        assert_eq!(snapshot.get("Sample.Inner.Depth"), Some(&json!(2)));
        assert_eq!(snapshot.get("SAMPLE.VALUE4"), Some(&json!(["a", "b"])));
        assert!(ConfigurationSnapshot::from_tree(1, &json!(5)).is_empty());
    }

    #[test]
    fn section_view_strips_prefix_and_keeps_case() {
        let snapshot = ConfigurationSnapshot::from_pairs(
            1,
            [
                ("Sample.Value1", json!("asd")),
                ("Sample.Value2", json!(123)),
                ("SampleOther.Value1", json!("no")),
            ],
        );
        let section = snapshot.section("sample");

        let fields: Vec<_> = section.entries().map(|(key, _)| key).collect();
        assert_eq!(fields, vec!["Value1", "Value2"]);
        assert_eq!(section.get("VALUE2"), Some(&json!(123)));
        assert!(!snapshot.section("Missing").exists());
    }

    #[test]
    fn changed_keys_cover_updates_additions_and_removals() {
        let before =
            ConfigurationSnapshot::from_pairs(1, [("A.X", json!(1)), ("A.Y", json!(2))]);
        let after = ConfigurationSnapshot::from_pairs(2, [("A.X", json!(1)), ("A.Z", json!(3))]);

        assert_eq!(after.changed_keys(&before), vec!["A.Y", "A.Z"]);
        assert!(!after.same_content(&before));
        assert!(before.same_content(&before.with_generation(9)));
    }
}

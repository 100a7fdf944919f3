//! 示例配置

use hearth_config::{BindOptions, OptionsSchema};
use serde::Serialize;

/// 示例配置节名称
pub const SAMPLE_SECTION: &str = "Sample";

/// 示例配置
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SampleSettings {
    /// 文本值
    pub value1: String,
    /// 整数值
    pub value2: i32,
    pub value3: f64,
    pub value4: Vec<String>,
}

impl BindOptions for SampleSettings {
    fn schema() -> OptionsSchema<Self> {
        OptionsSchema::new()
            .field("Value1", |s: &mut Self, v: String| s.value1 = v)
            .field("Value2", |s: &mut Self, v: i32| s.value2 = v)
            .field("Value3", |s: &mut Self, v: f64| s.value3 = v)
            .field("Value4", |s: &mut Self, v: Vec<String>| s.value4 = v)
    }
}

impl SampleSettings {
    /// 格式化为缩进的 JSON 文本
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<序列化失败: {e}>"))
    }
}

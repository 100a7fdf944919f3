//! hearth-config 组件测试

mod source_tests;

use crate::{BindOptions, ConfigurationSource, MemoryReader, OptionsSchema};
use serde_json::{json, Value};
use std::sync::Arc;

/// 测试用选项类型
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SampleSettings {
    pub value1: String,
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

pub(crate) fn sample_tree(value1: &str) -> Value {
    json!({"Sample": {"Value1": value1, "Value2": 123}})
}

/// 内容可由测试直接替换的配置源
pub(crate) fn memory_source(tree: Value) -> (Arc<ConfigurationSource>, Arc<MemoryReader>) {
    let reader = Arc::new(MemoryReader::new(Some(tree)));
    let source = Arc::new(ConfigurationSource::load("appsettings.json", reader.clone()));
    (source, reader)
}

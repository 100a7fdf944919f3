//! 组合层测试


use hearth_config::{BindOptions, OptionsSchema};

/// 测试用选项类型
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PaneSettings {
    pub title: String,
    pub refresh_seconds: u32,
}

impl BindOptions for PaneSettings {
    fn schema() -> OptionsSchema<Self> {
        OptionsSchema::new()
            .field("Title", |s: &mut Self, v: String| s.title = v)
            .field("RefreshSeconds", |s: &mut Self, v: u32| s.refresh_seconds = v)
    }
}

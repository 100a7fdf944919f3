//! 配置文件读取抽象接口

use hearth_common::ConfigError;
use serde_json::Value;
use std::path::Path;

/// 配置文件读取器 trait
///
/// 把文本配置解析为嵌套的键值树。文件不存在时返回 `Ok(None)`，
/// 内容无法解析时返回 [`ConfigError::ParseError`]。
pub trait ConfigurationFileReader: Send + Sync {
    /// 读取配置文件
    fn read(&self, path: &Path) -> Result<Option<Value>, ConfigError>;

    /// 读取器支持的格式名称
    fn format(&self) -> &str;
}

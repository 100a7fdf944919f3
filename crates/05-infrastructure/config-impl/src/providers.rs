//! 配置文件读取器实现

use hearth_common::ConfigError;
use hearth_config_abstractions::ConfigurationFileReader;
use parking_lot::Mutex;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// 读取文件内容，文件不存在时返回 `None`
fn read_text(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ConfigError::FileReadError { source: err }),
    }
}

/// JSON 配置文件读取器
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileReader;

impl ConfigurationFileReader for JsonFileReader {
    fn read(&self, path: &Path) -> Result<Option<Value>, ConfigError> {
        let Some(content) = read_text(path)? else {
            return Ok(None);
        };
        debug!("解析 JSON 配置文件: {}", path.display());

        // 空文件视为空配置
        if content.trim().is_empty() {
            return Ok(Some(Value::Object(Default::default())));
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::parse_error(path.display().to_string(), e))
    }

    fn format(&self) -> &str {
        "json"
    }
}

/// TOML 配置文件读取器
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlFileReader;

impl TomlFileReader {
    /// 将 TOML 值转换为 JSON 值
    fn toml_to_json(value: &toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::String(s.clone()),
            toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
            toml::Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(*b),
            toml::Value::Array(arr) => Value::Array(arr.iter().map(Self::toml_to_json).collect()),
            toml::Value::Table(table) => Value::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::toml_to_json(v)))
                    .collect(),
            ),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        }
    }
}

impl ConfigurationFileReader for TomlFileReader {
    fn read(&self, path: &Path) -> Result<Option<Value>, ConfigError> {
        let Some(content) = read_text(path)? else {
            return Ok(None);
        };
        debug!("解析 TOML 配置文件: {}", path.display());

        let table: toml::Table = toml::from_str(&content)
            .map_err(|e| ConfigError::parse_error(path.display().to_string(), e))?;
        Ok(Some(Self::toml_to_json(&toml::Value::Table(table))))
    }

    fn format(&self) -> &str {
        "toml"
    }
}

/// YAML 配置文件读取器
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlFileReader;

impl ConfigurationFileReader for YamlFileReader {
    fn read(&self, path: &Path) -> Result<Option<Value>, ConfigError> {
        let Some(content) = read_text(path)? else {
            return Ok(None);
        };
        debug!("解析 YAML 配置文件: {}", path.display());

        if content.trim().is_empty() {
            return Ok(Some(Value::Object(Default::default())));
        }
        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::parse_error(path.display().to_string(), e))
    }

    fn format(&self) -> &str {
        "yaml"
    }
}

/// 内存配置读取器
///
/// 内容由调用方直接设置，忽略路径参数；`None` 表示配置不存在。
#[derive(Debug, Default)]
pub struct MemoryReader {
    content: Mutex<Option<Value>>,
}

impl MemoryReader {
    /// 创建内存读取器
    pub fn new(content: Option<Value>) -> Self {
        Self {
            content: Mutex::new(content),
        }
    }

    /// 替换内容
    pub fn set(&self, content: Option<Value>) {
        *self.content.lock() = content;
    }
}

impl ConfigurationFileReader for MemoryReader {
    fn read(&self, _path: &Path) -> Result<Option<Value>, ConfigError> {
        Ok(self.content.lock().clone())
    }

    fn format(&self) -> &str {
        "memory"
    }
}

/// 按文件扩展名选择读取器
pub fn reader_for_path(path: &Path) -> Result<Arc<dyn ConfigurationFileReader>, ConfigError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => Ok(Arc::new(JsonFileReader)),
        Some("toml") => Ok(Arc::new(TomlFileReader)),
        Some("yaml" | "yml") => Ok(Arc::new(YamlFileReader)),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn readers_produce_equivalent_trees() {
        let json_file = write_temp(".json", r#"{"Sample": {"Value1": "asd", "Value2": 123}}"#);
        let toml_file = write_temp(".toml", "[Sample]\nValue1 = \"asd\"\nValue2 = 123\n");
        let yaml_file = write_temp(".yaml", "Sample:\n  Value1: asd\n  Value2: 123\n");

        let expected = json!({"Sample": {"Value1": "asd", "Value2": 123}});
        for file in [&json_file, &toml_file, &yaml_file] {
            let reader = reader_for_path(file.path()).unwrap();
            assert_eq!(reader.read(file.path()).unwrap(), Some(expected.clone()));
        }
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert_eq!(JsonFileReader.read(&path).unwrap(), None);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let file = write_temp(".json", "{ not json");
        let err = JsonFileReader.read(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = reader_for_path(Path::new("settings.ini")).err().unwrap();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }
}

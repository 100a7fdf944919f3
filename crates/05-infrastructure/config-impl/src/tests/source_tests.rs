//! 配置源加载测试

use crate::{ConfigurationSource, JsonFileReader, INITIAL_GENERATION};
use std::sync::Arc;

/// 测试配置文件不存在时得到空快照
#[tokio::test]
async fn test_missing_file_loads_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();

    for name in ["appsettings.json", "appsettings.toml", "appsettings.yaml"] {
        let source = ConfigurationSource::from_path(dir.path().join(name)).unwrap();
        assert!(source.snapshot().is_empty(), "{name} 应得到空快照");
        assert_eq!(source.generation(), INITIAL_GENERATION);
    }
}

/// 测试配置文件无法解析时得到空快照而不是失败
#[tokio::test]
async fn test_malformed_file_loads_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("appsettings.json");
    let toml = dir.path().join("appsettings.toml");
    std::fs::write(&json, r#"{"Sample": {"Value1": "#).unwrap();
    std::fs::write(&toml, "[Sample\nValue1 = ").unwrap();

    for path in [&json, &toml] {
        let source = ConfigurationSource::from_path(path).unwrap();
        assert!(source.snapshot().is_empty(), "{} 应得到空快照", path.display());
        assert_eq!(source.generation(), INITIAL_GENERATION);
    }

    let explicit = ConfigurationSource::load(&json, Arc::new(JsonFileReader));
    assert!(explicit.snapshot().is_empty());
    assert_eq!(explicit.generation(), INITIAL_GENERATION);
}

/// 测试文件出现后重新加载得到新代数的快照
#[tokio::test]
async fn test_file_created_after_load_is_picked_up_on_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appsettings.json");
    let source = ConfigurationSource::from_path(&path).unwrap();
    assert!(source.snapshot().is_empty());

    std::fs::write(&path, r#"{"Sample": {"Value1": "asd"}}"#).unwrap();
    assert!(source.reload());
    assert_eq!(source.generation(), INITIAL_GENERATION + 1);
    assert!(!source.snapshot().is_empty());
    assert!(!source.reload());
}

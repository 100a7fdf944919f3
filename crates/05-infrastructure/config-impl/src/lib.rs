//! # Configuration Implementation
//!
//! 配置的具体实现，提供配置文件读取、快照加载与重新加载、类型化选项和变更通知。
//!
//! ## 主要组件
//!
//! - [`ConfigurationSource`] - 配置快照的加载和原子替换
//! - [`JsonFileReader`] / [`TomlFileReader`] / [`YamlFileReader`] - 配置文件读取器
//! - [`ConfigBinder`] - 基于字段绑定表的配置绑定器
//! - [`OptionsProvider`] - 缓存、作用域缓存和实时三种选项访问方式
//! - [`ChangeNotifier`] - 配置变更订阅
//! - [`ConfigFileWatcher`] - 配置文件监控

pub mod binder;
pub mod notifier;
pub mod options;
pub mod providers;
pub mod source;
pub mod watcher;

pub use binder::*;
pub use notifier::*;
pub use options::*;
pub use providers::*;
pub use source::*;
pub use watcher::*;

pub use hearth_config_abstractions::*;

#[cfg(test)]
mod tests;

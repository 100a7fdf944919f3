//! # Configuration Abstractions
//!
//! 配置抽象层，定义配置快照、配置读取和选项绑定的核心接口和约定。
//!
//! ## 核心接口
//!
//! - [`ConfigurationFileReader`] - 配置文件读取接口
//! - [`ConfigurationSnapshot`] - 不可变的扁平化配置快照
//! - [`BindOptions`] - 选项类型的字段绑定表
//! - [`SnapshotObserver`] - 快照变更观察者

pub mod binding;
pub mod events;
pub mod reader;
pub mod snapshot;

pub use binding::*;
pub use events::*;
pub use reader::*;
pub use snapshot::*;

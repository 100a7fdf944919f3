//! # Hearth Common
//!
//! Hearth 基础设施层的公共类型：错误定义、组件生命周期和服务键。
//!
//! ## 核心类型
//!
//! - [`Lifetime`] - 组件生命周期
//! - [`Disposable`] - 作用域释放时的资源清理能力
//! - [`ServiceKey`] - 服务契约的类型标识
//! - [`DependencyError`] / [`ConfigError`] / [`BindingError`] - 错误分类

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;

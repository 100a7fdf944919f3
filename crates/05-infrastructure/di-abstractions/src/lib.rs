//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义服务注册和依赖解析的核心接口。
//!
//! ## 核心接口
//!
//! - [`ServiceDescriptor`] - 服务注册描述（契约、实现、生命周期、依赖）
//! - [`ServiceResolver`] - 组件工厂使用的依赖解析接口
//! - [`ScopeContext`] / [`ScopeListener`] - 作用域状态与作用域事件
//! - [`AssemblyProvider`] - 声明式服务表，替代运行时类型扫描

pub mod container;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod scope;

pub use container::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;
pub use scope::*;

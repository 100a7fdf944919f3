//! # 依赖注入具体实现
//!
//! 提供服务注册表、容器、作用域和解析上下文的具体实现。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let mut registry = ServiceRegistry::new();
//! registry.register(ServiceDescriptor::singleton::<dyn Clock, _>(|_| Ok(Arc::new(SystemClock))));
//! let container = registry.build();
//!
//! let clock = container.resolve::<dyn Clock>()?;
//! let scope = container.open_scope();
//! let session = scope.resolve::<Session>()?;
//! ```

mod construction;
mod container;
mod registry;
mod resolution;
mod scope;

pub use container::{Container, ContainerBuilder};
pub use registry::ServiceRegistry;
pub use scope::Scope;

pub use hearth_di_abstractions::*;

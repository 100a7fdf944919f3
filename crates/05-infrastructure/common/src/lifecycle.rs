//! 组件生命周期定义

use std::fmt;

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// 单例模式 - 容器生命周期内只创建一个实例
    Singleton,
    /// 作用域模式 - 在同一作用域内共享实例
    Scoped,
    /// 瞬时模式 - 每次解析都创建新实例
    #[default]
    Transient,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Singleton => "Singleton",
            Self::Scoped => "Scoped",
            Self::Transient => "Transient",
        };
        f.write_str(name)
    }
}

/// 可释放资源 trait
///
/// 作用域释放时，作用域内创建的、登记了释放能力的实例会按创建顺序的逆序调用 `dispose`。
pub trait Disposable: Send + Sync {
    /// 释放持有的资源
    fn dispose(&self);
}

//! 服务元数据定义

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 服务键
///
/// 由契约类型的 `TypeId` 唯一确定，类型名称只用于日志和错误信息。
/// 契约类型既可以是具体类型，也可以是 `dyn Trait`。
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    type_name: &'static str,
}

impl ServiceKey {
    /// 从类型获取服务键
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 类型ID
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// 完整类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// 去掉外层类型的模块路径，例如
/// `hearth_config::options::CachedOptions<app::SampleSettings>` -> `CachedOptions<app::SampleSettings>`
pub fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

//! 组件解析器抽象接口
//!
//! 组件工厂通过 [`ServiceResolver`] 获取构造参数，实现构造函数注入

use crate::scope::ScopeContext;
use hearth_common::{DependencyError, ServiceKey};
use std::any::Any;
use std::sync::Arc;

/// 类型擦除后的服务实例
///
/// 内部保存的是 `Arc<T>`，因此 `T` 可以是 `dyn Trait`。
pub type AnyInstance = Arc<dyn Any + Send + Sync>;

/// 服务解析器 trait
///
/// 由容器在构造实例时传给组件工厂，携带当前解析链和活动作用域。
pub trait ServiceResolver {
    /// 按服务键解析实例
    fn resolve_key(&self, key: ServiceKey) -> Result<AnyInstance, DependencyError>;

    /// 按服务键解析实例，未注册时返回 `None`
    fn try_resolve_key(&self, key: ServiceKey) -> Result<Option<AnyInstance>, DependencyError>;

    /// 检查服务是否已注册
    fn is_registered(&self, key: ServiceKey) -> bool;

    /// 当前活动作用域
    fn current_scope(&self) -> Option<&dyn ScopeContext>;
}

impl dyn ServiceResolver + '_ {
    /// 解析必需依赖
    pub fn resolve<T>(&self) -> Result<Arc<T>, DependencyError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.resolve_key(ServiceKey::of::<T>())?;
        downcast_instance::<T>(&instance)
    }

    /// 解析可选依赖，未注册时返回 `None`
    pub fn resolve_optional<T>(&self) -> Result<Option<Arc<T>>, DependencyError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.try_resolve_key(ServiceKey::of::<T>())?
            .map(|instance| downcast_instance::<T>(&instance))
            .transpose()
    }
}

/// 把 `T` 包装为类型擦除实例
pub fn erase_instance<T>(instance: Arc<T>) -> AnyInstance
where
    T: ?Sized + Send + Sync + 'static,
{
    Arc::new(instance)
}

/// 从类型擦除实例还原 `Arc<T>`
pub fn downcast_instance<T>(instance: &AnyInstance) -> Result<Arc<T>, DependencyError>
where
    T: ?Sized + Send + Sync + 'static,
{
    (**instance)
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| DependencyError::TypeMismatch {
            type_name: std::any::type_name::<T>().to_string(),
        })
}

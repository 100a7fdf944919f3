//! 作用域抽象接口

use crate::resolver::AnyInstance;
use hearth_common::DependencyError;
use std::any::{Any, TypeId};
use std::sync::Arc;
use uuid::Uuid;

/// 作用域上下文 trait
///
/// 除作用域服务实例外，作用域还可以保存按类型区分的附加状态，
/// 供需要"每个作用域一份"数据的组件使用（例如固定在作用域上的配置快照）。
pub trait ScopeContext: Send + Sync {
    /// 作用域ID
    fn id(&self) -> Uuid;

    /// 作用域是否已释放
    fn is_disposed(&self) -> bool;

    /// 读取附加状态
    fn state_entry(&self, key: TypeId) -> Option<AnyInstance>;

    /// 读取附加状态，不存在时用 `init` 创建并保存
    fn state_entry_or_insert(
        &self,
        key: TypeId,
        init: &mut dyn FnMut() -> AnyInstance,
    ) -> Result<AnyInstance, DependencyError>;
}

impl dyn ScopeContext + '_ {
    /// 获取类型化的附加状态
    pub fn state<S: Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        self.state_entry(TypeId::of::<S>())
            .and_then(|entry| entry.downcast::<S>().ok())
    }

    /// 获取类型化的附加状态，不存在时创建
    ///
    /// 作用域已释放时返回 [`DependencyError::ScopeDisposed`]。
    pub fn state_or_insert_with<S, F>(&self, init: F) -> Result<Arc<S>, DependencyError>
    where
        S: Send + Sync + 'static,
        F: FnOnce() -> S,
    {
        let mut init = Some(init);
        let mut make = || -> AnyInstance {
            let value = init.take().map(|f| f());
            match value {
                Some(value) => Arc::new(value),
                None => Arc::new(()),
            }
        };
        let entry = self.state_entry_or_insert(TypeId::of::<S>(), &mut make)?;
        entry
            .downcast::<S>()
            .map_err(|_: Arc<dyn Any + Send + Sync>| DependencyError::TypeMismatch {
                type_name: std::any::type_name::<S>().to_string(),
            })
    }
}

/// 作用域事件监听器
///
/// 在容器构建时登记，作用域打开和释放时被调用。
pub trait ScopeListener: Send + Sync {
    /// 作用域已打开
    fn on_scope_opened(&self, scope: &dyn ScopeContext);

    /// 作用域已释放
    fn on_scope_disposed(&self, _scope: &dyn ScopeContext) {}
}

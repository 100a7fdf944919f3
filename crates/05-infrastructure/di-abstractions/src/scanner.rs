//! 服务程序集扫描接口
//!
//! 程序集以 [`AssemblyProvider`] 的形式暴露自己包含的类型表，
//! 标记为服务的类型会在扫描时按声明的契约和生命周期注册。

use crate::registry::{Injectable, ServiceDescriptor};
use hearth_common::{Disposable, Lifetime, ServiceKey};
use std::fmt;
use std::sync::Arc;

/// 程序集提供者 trait
pub trait AssemblyProvider: Send + Sync {
    /// 程序集名称，用于重复扫描判断
    fn name(&self) -> &str;

    /// 枚举程序集中的类型
    fn enumerate_types(&self) -> Vec<TypeDescriptor>;

    /// 引用的其他程序集
    fn referenced(&self) -> Vec<Arc<dyn AssemblyProvider>> {
        Vec::new()
    }
}

type ContractFactory = Box<dyn Fn(Lifetime) -> ServiceDescriptor + Send + Sync>;

/// 契约绑定
pub struct ContractBinding {
    key: ServiceKey,
    make: ContractFactory,
}

impl ContractBinding {
    /// 契约服务键
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    /// 以给定生命周期生成注册描述
    pub fn descriptor(&self, lifetime: Lifetime) -> ServiceDescriptor {
        (self.make)(lifetime)
    }
}

/// 服务标记
pub struct ServiceMarker {
    /// 声明的生命周期，未声明时按瞬时注册
    pub lifetime: Option<Lifetime>,
    /// 声明的契约
    pub contracts: Vec<ContractBinding>,
}

/// 类型描述
pub struct TypeDescriptor {
    type_name: &'static str,
    marker: Option<ServiceMarker>,
}

impl TypeDescriptor {
    /// 未标记为服务的普通类型
    pub fn plain<T: ?Sized + 'static>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            marker: None,
        }
    }

    /// 标记为服务的类型
    pub fn service<I: Injectable>() -> ServiceTypeBuilder<I> {
        ServiceTypeBuilder {
            lifetime: None,
            contracts: Vec::new(),
            _implementation: std::marker::PhantomData,
        }
    }

    /// 类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 服务标记
    pub fn marker(&self) -> Option<&ServiceMarker> {
        self.marker.as_ref()
    }

    /// 是否为服务类型
    pub fn is_service(&self) -> bool {
        self.marker.is_some()
    }

    /// 生成注册描述，普通类型返回空列表
    pub fn registrations(&self) -> Vec<ServiceDescriptor> {
        let Some(marker) = &self.marker else {
            return Vec::new();
        };
        let lifetime = marker.lifetime.unwrap_or_default();
        marker
            .contracts
            .iter()
            .map(|contract| contract.descriptor(lifetime))
            .collect()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contracts: Vec<_> = self
            .marker
            .iter()
            .flat_map(|m| m.contracts.iter().map(|c| c.key.short_name()))
            .collect();
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("lifetime", &self.marker.as_ref().map(|m| m.lifetime))
            .field("contracts", &contracts)
            .finish()
    }
}

/// 服务类型描述构建器
pub struct ServiceTypeBuilder<I> {
    lifetime: Option<Lifetime>,
    contracts: Vec<ContractBinding>,
    _implementation: std::marker::PhantomData<fn() -> I>,
}

impl<I: Injectable> ServiceTypeBuilder<I> {
    /// 声明生命周期
    #[must_use]
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// 以实现类型自身作为契约
    #[must_use]
    pub fn as_self(self) -> Self {
        self.contract::<I>(|service| service)
    }

    /// 声明契约
    #[must_use]
    pub fn contract<C>(mut self, upcast: fn(Arc<I>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.contracts.push(ContractBinding {
            key: ServiceKey::of::<C>(),
            make: Box::new(move |lifetime| ServiceDescriptor::bind::<C, I>(lifetime, upcast).build()),
        });
        self
    }

    /// 声明契约，作用域释放时调用 [`Disposable::dispose`]
    #[must_use]
    pub fn disposable_contract<C>(mut self, upcast: fn(Arc<I>) -> Arc<C>) -> Self
    where
        C: ?Sized + Disposable + 'static,
    {
        self.contracts.push(ContractBinding {
            key: ServiceKey::of::<C>(),
            make: Box::new(move |lifetime| {
                ServiceDescriptor::bind::<C, I>(lifetime, upcast)
                    .disposable()
                    .build()
            }),
        });
        self
    }

    /// 完成构建，未声明契约时以自身类型注册
    pub fn build(self) -> TypeDescriptor {
        let builder = if self.contracts.is_empty() {
            self.as_self()
        } else {
            self
        };
        TypeDescriptor {
            type_name: std::any::type_name::<I>(),
            marker: Some(ServiceMarker {
                lifetime: builder.lifetime,
                contracts: builder.contracts,
            }),
        }
    }
}

impl<I: Injectable> From<ServiceTypeBuilder<I>> for TypeDescriptor {
    fn from(builder: ServiceTypeBuilder<I>) -> Self {
        builder.build()
    }
}

/// 静态程序集
///
/// 以函数形式提供类型表，适合在各 crate 中声明自己的服务清单。
pub struct StaticAssembly {
    name: String,
    types: fn() -> Vec<TypeDescriptor>,
    references: Vec<Arc<dyn AssemblyProvider>>,
}

impl StaticAssembly {
    /// 创建静态程序集
    pub fn new(name: impl Into<String>, types: fn() -> Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            types,
            references: Vec::new(),
        }
    }

    /// 添加引用的程序集
    #[must_use]
    pub fn with_reference(mut self, assembly: Arc<dyn AssemblyProvider>) -> Self {
        self.references.push(assembly);
        self
    }
}

impl AssemblyProvider for StaticAssembly {
    fn name(&self) -> &str {
        &self.name
    }

    fn enumerate_types(&self) -> Vec<TypeDescriptor> {
        (self.types)()
    }

    fn referenced(&self) -> Vec<Arc<dyn AssemblyProvider>> {
        self.references.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ServiceResolver;
    use hearth_common::DependencyError;

    trait Clock: Send + Sync {}

    struct SystemClock;

    impl Clock for SystemClock {}

    impl Injectable for SystemClock {
        fn inject(_resolver: &dyn ServiceResolver) -> Result<Self, DependencyError> {
            Ok(Self)
        }
    }

    fn types() -> Vec<TypeDescriptor> {
        vec![
            TypeDescriptor::plain::<String>(),
            TypeDescriptor::service::<SystemClock>()
                .contract::<dyn Clock>(|clock| clock)
                .build(),
        ]
    }

    #[test]
    fn unmarked_types_produce_no_registrations() {
        assert!(TypeDescriptor::plain::<String>().registrations().is_empty());
    }

    #[test]
    fn marked_types_default_to_transient() {
        let assembly = StaticAssembly::new("clock", types);
        let registrations: Vec<_> = assembly
            .enumerate_types()
            .iter()
            .flat_map(TypeDescriptor::registrations)
            .collect();

        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].key(), ServiceKey::of::<dyn Clock>());
        assert_eq!(registrations[0].lifetime(), Lifetime::Transient);
    }

    #[test]
    fn service_without_contract_registers_itself() {
        let descriptor = TypeDescriptor::service::<SystemClock>()
            .lifetime(Lifetime::Singleton)
            .build();
        let registrations = descriptor.registrations();

        assert_eq!(registrations[0].key(), ServiceKey::of::<SystemClock>());
        assert_eq!(registrations[0].lifetime(), Lifetime::Singleton);
    }
}

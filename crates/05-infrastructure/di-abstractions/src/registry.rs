//! 服务注册描述
//!
//! 一条注册由契约键、生命周期、实例工厂、声明的依赖列表和可选的释放回调组成。
//! 类型化的 [`ServiceBuilder`] 负责把具体类型的工厂擦除为 [`InstanceFactory`]。

use crate::resolver::{erase_instance, AnyInstance, ServiceResolver};
use hearth_common::{DependencyError, Disposable, Lifetime, ServiceKey};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 类型擦除的实例工厂
pub type InstanceFactory =
    Arc<dyn Fn(&dyn ServiceResolver) -> Result<AnyInstance, DependencyError> + Send + Sync>;

/// 实例释放回调
pub type Disposer = Arc<dyn Fn(&AnyInstance) + Send + Sync>;

/// 声明的依赖
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// 依赖的服务键
    pub key: ServiceKey,
    /// 可选依赖在未注册时解析为 `None`
    pub optional: bool,
}

impl Dependency {
    /// 必需依赖
    pub fn required<T: ?Sized + 'static>() -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            optional: false,
        }
    }

    /// 可选依赖
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            optional: true,
        }
    }
}

/// 实现来源
#[derive(Clone)]
pub enum Implementation {
    /// 由工厂按需构造
    Factory(InstanceFactory),
    /// 预先构造的实例
    Instance(AnyInstance),
}

/// 可注入类型
///
/// 声明构造所需的依赖，并从解析器取得依赖完成构造。
pub trait Injectable: Send + Sync + Sized + 'static {
    /// 声明的依赖列表，用于首次解析时的循环依赖检查
    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }

    /// 构造实例
    fn inject(resolver: &dyn ServiceResolver) -> Result<Self, DependencyError>;
}

/// 服务注册描述
#[derive(Clone)]
pub struct ServiceDescriptor {
    key: ServiceKey,
    lifetime: Lifetime,
    implementation: Implementation,
    implementation_name: &'static str,
    dependencies: Vec<Dependency>,
    disposer: Option<Disposer>,
}

impl ServiceDescriptor {
    /// 单例注册
    pub fn singleton<T, F>(factory: F) -> ServiceBuilder<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> Result<Arc<T>, DependencyError> + Send + Sync + 'static,
    {
        ServiceBuilder::from_factory(Lifetime::Singleton, factory)
    }

    /// 作用域注册
    pub fn scoped<T, F>(factory: F) -> ServiceBuilder<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> Result<Arc<T>, DependencyError> + Send + Sync + 'static,
    {
        ServiceBuilder::from_factory(Lifetime::Scoped, factory)
    }

    /// 瞬时注册
    pub fn transient<T, F>(factory: F) -> ServiceBuilder<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> Result<Arc<T>, DependencyError> + Send + Sync + 'static,
    {
        ServiceBuilder::from_factory(Lifetime::Transient, factory)
    }

    /// 以指定生命周期注册工厂
    pub fn with_factory<T, F>(lifetime: Lifetime, factory: F) -> ServiceBuilder<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> Result<Arc<T>, DependencyError> + Send + Sync + 'static,
    {
        ServiceBuilder::from_factory(lifetime, factory)
    }

    /// 注册预先构造的实例，生命周期固定为单例
    pub fn instance<T>(instance: Arc<T>) -> ServiceBuilder<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ServiceBuilder::new(
            Lifetime::Singleton,
            Implementation::Instance(erase_instance(instance)),
            std::any::type_name::<T>(),
        )
    }

    /// 以自身类型注册可注入类型
    pub fn injectable<T: Injectable>(lifetime: Lifetime) -> ServiceBuilder<T> {
        Self::bind::<T, T>(lifetime, |instance| instance)
    }

    /// 把可注入实现 `I` 绑定到契约 `C`
    ///
    /// `upcast` 通常写作 `|service| service`，由编译器完成到 `Arc<dyn Trait>` 的转换。
    pub fn bind<C, I>(lifetime: Lifetime, upcast: fn(Arc<I>) -> Arc<C>) -> ServiceBuilder<C>
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable,
    {
        let factory: InstanceFactory = Arc::new(move |resolver: &dyn ServiceResolver| {
            let service = I::inject(resolver)?;
            Ok(erase_instance(upcast(Arc::new(service))))
        });
        let mut builder = ServiceBuilder::new(
            lifetime,
            Implementation::Factory(factory),
            std::any::type_name::<I>(),
        );
        builder.descriptor.dependencies = I::dependencies();
        builder
    }

    /// 服务键
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    /// 生命周期
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 实现来源
    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    /// 实现类型名称
    pub fn implementation_name(&self) -> &'static str {
        self.implementation_name
    }

    /// 声明的依赖
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// 释放回调
    pub fn disposer(&self) -> Option<&Disposer> {
        self.disposer.as_ref()
    }

    /// 修改生命周期（预先构造的实例始终为单例）
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        if !matches!(self.implementation, Implementation::Instance(_)) {
            self.lifetime = lifetime;
        }
        self
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("implementation", &self.implementation_name)
            .field("dependencies", &self.dependencies)
            .field("disposable", &self.disposer.is_some())
            .finish()
    }
}

/// 类型化的注册构建器
pub struct ServiceBuilder<T: ?Sized> {
    descriptor: ServiceDescriptor,
    _contract: PhantomData<fn() -> Arc<T>>,
}

impl<T> ServiceBuilder<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn new(
        lifetime: Lifetime,
        implementation: Implementation,
        implementation_name: &'static str,
    ) -> Self {
        Self {
            descriptor: ServiceDescriptor {
                key: ServiceKey::of::<T>(),
                lifetime,
                implementation,
                implementation_name,
                dependencies: Vec::new(),
                disposer: None,
            },
            _contract: PhantomData,
        }
    }

    fn from_factory<F>(lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&dyn ServiceResolver) -> Result<Arc<T>, DependencyError> + Send + Sync + 'static,
    {
        let factory: InstanceFactory = Arc::new(move |resolver: &dyn ServiceResolver| {
            factory(resolver).map(erase_instance)
        });
        Self::new(
            lifetime,
            Implementation::Factory(factory),
            std::any::type_name::<T>(),
        )
    }

    /// 声明必需依赖
    #[must_use]
    pub fn depends_on<D: ?Sized + 'static>(mut self) -> Self {
        self.push_dependency(Dependency::required::<D>());
        self
    }

    /// 声明可选依赖
    #[must_use]
    pub fn optional<D: ?Sized + 'static>(mut self) -> Self {
        self.push_dependency(Dependency::optional::<D>());
        self
    }

    /// 覆盖日志中显示的实现名称
    #[must_use]
    pub fn implemented_by(mut self, name: &'static str) -> Self {
        self.descriptor.implementation_name = name;
        self
    }

    /// 构建注册描述
    pub fn build(self) -> ServiceDescriptor {
        self.descriptor
    }

    fn push_dependency(&mut self, dependency: Dependency) {
        if !self.descriptor.dependencies.contains(&dependency) {
            self.descriptor.dependencies.push(dependency);
        }
    }
}

impl<T> ServiceBuilder<T>
where
    T: ?Sized + Disposable + 'static,
{
    /// 作用域释放时调用实例的 [`Disposable::dispose`]
    #[must_use]
    pub fn disposable(mut self) -> Self {
        let disposer: Disposer = Arc::new(|instance: &AnyInstance| {
            if let Some(service) = instance.downcast_ref::<Arc<T>>() {
                service.dispose();
            }
        });
        self.descriptor.disposer = Some(disposer);
        self
    }
}

impl<T: ?Sized + Send + Sync + 'static> From<ServiceBuilder<T>> for ServiceDescriptor {
    fn from(builder: ServiceBuilder<T>) -> Self {
        builder.build()
    }
}

/// 依赖图
pub trait DependencyGraph {
    /// 查询服务声明的依赖，未注册时返回 `None`
    fn dependencies_of(&self, key: ServiceKey) -> Option<&[Dependency]>;
}

/// 循环依赖检测器
pub trait CircularDependencyDetector: Send + Sync {
    /// 从 `root` 出发检查依赖图，成功时返回所有已检查的服务键
    fn check_from(
        &self,
        root: ServiceKey,
        graph: &dyn DependencyGraph,
    ) -> Result<Vec<ServiceKey>, DependencyError>;
}

/// 默认循环依赖检测器
#[derive(Debug, Default)]
pub struct DefaultCircularDependencyDetector;

impl CircularDependencyDetector for DefaultCircularDependencyDetector {
    fn check_from(
        &self,
        root: ServiceKey,
        graph: &dyn DependencyGraph,
    ) -> Result<Vec<ServiceKey>, DependencyError> {
        // 深度优先搜索，visiting 保存从根节点出发的当前路径
        let mut visited = HashSet::new();
        let mut visiting = Vec::new();
        self.dfs_check(root, graph, &mut visited, &mut visiting)?;
        Ok(visited.into_iter().collect())
    }
}

impl DefaultCircularDependencyDetector {
    fn dfs_check(
        &self,
        current: ServiceKey,
        graph: &dyn DependencyGraph,
        visited: &mut HashSet<ServiceKey>,
        visiting: &mut Vec<ServiceKey>,
    ) -> Result<(), DependencyError> {
        if visiting.contains(&current) {
            let chain = visiting
                .iter()
                .chain(std::iter::once(&current))
                .map(ServiceKey::short_name)
                .collect::<Vec<_>>()
                .join(" -> ");

            return Err(DependencyError::CircularDependency {
                dependency_chain: chain,
            });
        }

        if visited.contains(&current) {
            return Ok(());
        }

        let Some(dependencies) = graph.dependencies_of(current) else {
            return Err(DependencyError::ComponentNotRegistered {
                type_name: current.type_name().to_string(),
                required_by: visiting.last().map(|k| k.type_name().to_string()),
            });
        };

        visiting.push(current);
        for dependency in dependencies {
            if dependency.optional && graph.dependencies_of(dependency.key).is_none() {
                continue;
            }
            self.dfs_check(dependency.key, graph, visited, visiting)?;
        }
        visiting.pop();
        visited.insert(current);

        Ok(())
    }
}

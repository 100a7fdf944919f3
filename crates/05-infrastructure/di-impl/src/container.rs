//! 服务容器

use crate::construction::ConstructionTracker;
use crate::registry::ServiceRegistry;
use crate::resolution::ResolutionContext;
use crate::scope::{Scope, ScopeInner};
use dashmap::DashSet;
use hearth_common::{DependencyError, Lifetime, ServiceKey};
use hearth_di_abstractions::{
    downcast_instance, AnyInstance, CircularDependencyDetector, ContainerOptions,
    DefaultCircularDependencyDetector, Dependency, DependencyGraph, Implementation,
    ScopeListener, ServiceDescriptor,
};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// 容器内的注册项
pub(crate) struct Registration {
    pub(crate) descriptor: ServiceDescriptor,
    /// 单例实例，只在单例生命周期下使用
    pub(crate) singleton: OnceCell<AnyInstance>,
}

impl Registration {
    fn new(descriptor: ServiceDescriptor) -> Self {
        let singleton = match descriptor.implementation() {
            Implementation::Instance(instance) => OnceCell::with_value(instance.clone()),
            Implementation::Factory(_) => OnceCell::new(),
        };
        Self {
            descriptor,
            singleton,
        }
    }
}

pub(crate) struct ContainerInner {
    pub(crate) registrations: HashMap<ServiceKey, Registration>,
    pub(crate) listeners: Vec<Arc<dyn ScopeListener>>,
    pub(crate) options: ContainerOptions,
    detector: Arc<dyn CircularDependencyDetector>,
    verified: DashSet<ServiceKey>,
    pub(crate) tracker: ConstructionTracker,
}

impl ContainerInner {
    /// 首次解析时检查依赖图，检查通过的服务键会被缓存
    pub(crate) fn ensure_verified(&self, key: ServiceKey) -> Result<(), DependencyError> {
        if !self.options.enable_circular_dependency_detection || self.verified.contains(&key) {
            return Ok(());
        }

        let checked = self.detector.check_from(key, self)?;
        debug!("服务 {} 的依赖图检查通过，共 {} 个节点", key, checked.len());
        for checked_key in checked {
            self.verified.insert(checked_key);
        }
        Ok(())
    }
}

impl DependencyGraph for ContainerInner {
    fn dependencies_of(&self, key: ServiceKey) -> Option<&[Dependency]> {
        self.registrations
            .get(&key)
            .map(|registration| registration.descriptor.dependencies())
    }
}

/// 容器构建器
pub struct ContainerBuilder {
    registry: ServiceRegistry,
    listeners: Vec<Arc<dyn ScopeListener>>,
    options: ContainerOptions,
    detector: Arc<dyn CircularDependencyDetector>,
}

impl ContainerBuilder {
    /// 从注册表创建构建器
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            registry,
            listeners: Vec::new(),
            options: ContainerOptions::default(),
            detector: Arc::new(DefaultCircularDependencyDetector),
        }
    }

    /// 登记作用域监听器
    #[must_use]
    pub fn with_scope_listener(mut self, listener: Arc<dyn ScopeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 设置容器配置
    #[must_use]
    pub fn with_options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    /// 替换循环依赖检测器
    #[must_use]
    pub fn with_cycle_detector(mut self, detector: Arc<dyn CircularDependencyDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// 构建容器，之后注册表不可再修改
    pub fn build(self) -> Container {
        let registrations: HashMap<_, _> = self
            .registry
            .into_descriptors()
            .into_iter()
            .map(|descriptor| (descriptor.key(), Registration::new(descriptor)))
            .collect();

        info!("构建容器完成，注册了 {} 个服务", registrations.len());

        Container {
            inner: Arc::new(ContainerInner {
                registrations,
                listeners: self.listeners,
                options: self.options,
                detector: self.detector,
                verified: DashSet::new(),
                tracker: ConstructionTracker::default(),
            }),
        }
    }
}

/// 服务容器
///
/// 克隆得到的是同一个容器的句柄。
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    /// 解析服务
    ///
    /// 作用域服务不能从容器直接解析，会返回 [`DependencyError::ScopeRequired`]。
    pub fn resolve<T>(&self) -> Result<Arc<T>, DependencyError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = ResolutionContext::new(&self.inner, None).resolve(ServiceKey::of::<T>())?;
        downcast_instance::<T>(&instance)
    }

    /// 解析服务，未注册时返回 `None`
    pub fn try_resolve<T>(&self) -> Result<Option<Arc<T>>, DependencyError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if !self.is_registered::<T>() {
            return Ok(None);
        }
        self.resolve::<T>().map(Some)
    }

    /// 检查服务是否已注册
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.inner
            .registrations
            .contains_key(&ServiceKey::of::<T>())
    }

    /// 查询服务的生命周期
    pub fn lifetime_of<T: ?Sized + 'static>(&self) -> Option<Lifetime> {
        self.inner
            .registrations
            .get(&ServiceKey::of::<T>())
            .map(|registration| registration.descriptor.lifetime())
    }

    /// 已注册的服务键
    pub fn keys(&self) -> Vec<ServiceKey> {
        self.inner.registrations.keys().copied().collect()
    }

    /// 打开新的作用域
    pub fn open_scope(&self) -> Scope {
        let scope = Arc::new(ScopeInner::new(self.inner.clone()));
        debug!("打开作用域: {}", scope.id);

        for listener in &self.inner.listeners {
            listener.on_scope_opened(scope.as_ref());
        }
        Scope::from_inner(scope)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.inner.registrations.len())
            .field("listeners", &self.inner.listeners.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

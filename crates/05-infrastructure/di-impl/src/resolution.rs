//! 解析上下文
//!
//! 一次顶层解析对应一个上下文，保存当前解析链用于运行时循环检测。
//! 跨线程的循环由容器的构造跟踪检测。

use crate::construction::CellId;
use crate::container::{ContainerInner, Registration};
use crate::scope::ScopeInner;
use hearth_common::{DependencyError, Lifetime, ServiceKey};
use hearth_di_abstractions::{AnyInstance, Implementation, ScopeContext, ServiceResolver};
use once_cell::sync::OnceCell;
use std::cell::RefCell;
use tracing::trace;

pub(crate) struct ResolutionContext<'a> {
    container: &'a ContainerInner,
    scope: Option<&'a ScopeInner>,
    chain: RefCell<Vec<ServiceKey>>,
}

impl<'a> ResolutionContext<'a> {
    pub(crate) fn new(container: &'a ContainerInner, scope: Option<&'a ScopeInner>) -> Self {
        Self {
            container,
            scope,
            chain: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn resolve(&self, key: ServiceKey) -> Result<AnyInstance, DependencyError> {
        let Some(registration) = self.container.registrations.get(&key) else {
            return Err(DependencyError::ComponentNotRegistered {
                type_name: key.type_name().to_string(),
                required_by: self.chain.borrow().last().map(|k| k.type_name().to_string()),
            });
        };

        if let Some(scope) = self.scope {
            scope.ensure_active()?;
        }
        self.container.ensure_verified(key)?;

        self.enter(key)?;
        let result = self.activate(registration);
        self.chain.borrow_mut().pop();
        result
    }

    fn enter(&self, key: ServiceKey) -> Result<(), DependencyError> {
        let mut chain = self.chain.borrow_mut();
        if chain.contains(&key) {
            let cycle = Self::cycle_error(chain.iter().chain(std::iter::once(&key)));
            return Err(cycle);
        }
        chain.push(key);
        Ok(())
    }

    fn cycle_error<'k>(keys: impl Iterator<Item = &'k ServiceKey>) -> DependencyError {
        let dependency_chain = keys
            .map(ServiceKey::short_name)
            .collect::<Vec<_>>()
            .join(" -> ");
        DependencyError::CircularDependency { dependency_chain }
    }

    fn activate(&self, registration: &Registration) -> Result<AnyInstance, DependencyError> {
        let key = registration.descriptor.key();
        match registration.descriptor.lifetime() {
            Lifetime::Transient => self.construct(registration),
            Lifetime::Singleton => {
                self.shared(&registration.singleton, CellId::singleton(key), || {
                    // 单例按容器规则构造，默认不捕获当前作用域
                    let scope = if self.container.options.allow_scoped_in_singleton {
                        self.scope
                    } else {
                        None
                    };
                    let root = ResolutionContext {
                        container: self.container,
                        scope,
                        chain: RefCell::new(self.chain.borrow().clone()),
                    };
                    root.construct(registration)
                })
            }
            Lifetime::Scoped => {
                let scope = self.scope.ok_or_else(|| DependencyError::ScopeRequired {
                    type_name: key.type_name().to_string(),
                })?;
                let cell = scope.cell_for(key)?;
                self.shared(&cell, CellId::scoped(scope.id, key), || {
                    let instance = self.construct(registration)?;
                    if let Some(disposer) = registration.descriptor.disposer() {
                        scope.track(key, &instance, disposer.clone())?;
                    }
                    Ok(instance)
                })
            }
        }
    }

    /// 取得或构造共享实例
    ///
    /// 实例尚未构造完成时，先在跨线程等待图中登记；等待会与其他线程
    /// 互相阻塞时返回循环依赖错误而不是阻塞。
    fn shared<F>(
        &self,
        cell: &OnceCell<AnyInstance>,
        id: CellId,
        init: F,
    ) -> Result<AnyInstance, DependencyError>
    where
        F: FnOnce() -> Result<AnyInstance, DependencyError>,
    {
        if let Some(instance) = cell.get() {
            return Ok(instance.clone());
        }

        let tracker = &self.container.tracker;
        let _waiting = tracker.begin_wait(id).map_err(|path| {
            let chain = self.chain.borrow();
            Self::cycle_error(chain.iter().chain(path.iter().skip(1)))
        })?;

        cell.get_or_try_init(|| {
            let _constructing = tracker.begin_construct(id);
            init()
        })
        .cloned()
    }

    fn construct(&self, registration: &Registration) -> Result<AnyInstance, DependencyError> {
        match registration.descriptor.implementation() {
            Implementation::Instance(instance) => Ok(instance.clone()),
            Implementation::Factory(factory) => {
                trace!(
                    "构造 {} ({})",
                    registration.descriptor.key(),
                    registration.descriptor.implementation_name()
                );
                factory(self)
            }
        }
    }
}

impl ServiceResolver for ResolutionContext<'_> {
    fn resolve_key(&self, key: ServiceKey) -> Result<AnyInstance, DependencyError> {
        self.resolve(key)
    }

    fn try_resolve_key(&self, key: ServiceKey) -> Result<Option<AnyInstance>, DependencyError> {
        if !self.is_registered(key) {
            return Ok(None);
        }
        self.resolve(key).map(Some)
    }

    fn is_registered(&self, key: ServiceKey) -> bool {
        self.container.registrations.contains_key(&key)
    }

    fn current_scope(&self) -> Option<&dyn ScopeContext> {
        self.scope.map(|scope| scope as &dyn ScopeContext)
    }
}

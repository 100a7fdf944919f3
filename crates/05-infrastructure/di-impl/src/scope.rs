//! 服务作用域

use crate::container::{Container, ContainerInner};
use crate::resolution::ResolutionContext;
use chrono::{DateTime, Utc};
use hearth_common::{DependencyError, ServiceKey};
use hearth_di_abstractions::{downcast_instance, AnyInstance, Disposer, ScopeContext};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 作用域内需要释放的实例
struct TrackedInstance {
    key: ServiceKey,
    instance: AnyInstance,
    disposer: Disposer,
}

pub(crate) struct ScopeInner {
    pub(crate) id: Uuid,
    opened_at: DateTime<Utc>,
    container: Arc<ContainerInner>,
    disposed: AtomicBool,
    cells: Mutex<HashMap<ServiceKey, Arc<OnceCell<AnyInstance>>>>,
    tracked: Mutex<Vec<TrackedInstance>>,
    state: Mutex<HashMap<TypeId, AnyInstance>>,
}

impl ScopeInner {
    pub(crate) fn new(container: Arc<ContainerInner>) -> Self {
        Self {
            id: Uuid::new_v4(),
            opened_at: Utc::now(),
            container,
            disposed: AtomicBool::new(false),
            cells: Mutex::new(HashMap::new()),
            tracked: Mutex::new(Vec::new()),
            state: Mutex::new(HashMap::new()),
        }
    }

    fn disposed_error(&self) -> DependencyError {
        DependencyError::ScopeDisposed { scope_id: self.id }
    }

    pub(crate) fn ensure_active(&self) -> Result<(), DependencyError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(self.disposed_error());
        }
        Ok(())
    }

    /// 取得服务键在本作用域内的实例单元
    ///
    /// 单元格在短暂持锁时取得，构造过程不持有作用域锁。
    pub(crate) fn cell_for(
        &self,
        key: ServiceKey,
    ) -> Result<Arc<OnceCell<AnyInstance>>, DependencyError> {
        let mut cells = self.cells.lock();
        self.ensure_active()?;
        Ok(cells
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone())
    }

    pub(crate) fn track(
        &self,
        key: ServiceKey,
        instance: &AnyInstance,
        disposer: Disposer,
    ) -> Result<(), DependencyError> {
        let mut tracked = self.tracked.lock();
        if self.disposed.load(Ordering::Acquire) {
            // 构造期间作用域已被释放，立即释放该实例
            drop(tracked);
            disposer(instance);
            return Err(self.disposed_error());
        }
        tracked.push(TrackedInstance {
            key,
            instance: instance.clone(),
            disposer,
        });
        Ok(())
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let tracked = std::mem::take(&mut *self.tracked.lock());
        let count = tracked.len();
        for entry in tracked.into_iter().rev() {
            debug!("释放作用域实例: {}", entry.key);
            (entry.disposer)(&entry.instance);
        }
        self.cells.lock().clear();

        for listener in &self.container.listeners {
            listener.on_scope_disposed(self);
        }
        self.state.lock().clear();

        debug!("作用域 {} 已释放，释放了 {} 个实例", self.id, count);
    }
}

impl ScopeContext for ScopeInner {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn state_entry(&self, key: TypeId) -> Option<AnyInstance> {
        self.state.lock().get(&key).cloned()
    }

    fn state_entry_or_insert(
        &self,
        key: TypeId,
        init: &mut dyn FnMut() -> AnyInstance,
    ) -> Result<AnyInstance, DependencyError> {
        let mut state = self.state.lock();
        self.ensure_active()?;
        Ok(state.entry(key).or_insert_with(|| init()).clone())
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// 服务作用域
///
/// 作用域服务在同一作用域内共享，单例和瞬时服务仍按容器规则解析。
/// 释放作用域时，登记了释放回调的作用域实例按创建顺序的逆序释放；
/// 最后一个句柄被丢弃时作用域自动释放。
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    pub(crate) fn from_inner(inner: Arc<ScopeInner>) -> Self {
        Self { inner }
    }

    /// 作用域ID
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// 打开时间
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.inner.opened_at
    }

    /// 是否已释放
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// 所属容器
    pub fn container(&self) -> Container {
        Container {
            inner: self.inner.container.clone(),
        }
    }

    /// 解析服务
    pub fn resolve<T>(&self) -> Result<Arc<T>, DependencyError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let context = ResolutionContext::new(&self.inner.container, Some(&self.inner));
        let instance = context.resolve(ServiceKey::of::<T>())?;
        downcast_instance::<T>(&instance)
    }

    /// 解析服务，未注册时返回 `None`
    pub fn try_resolve<T>(&self) -> Result<Option<Arc<T>>, DependencyError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.ensure_active()?;
        if !self
            .inner
            .container
            .registrations
            .contains_key(&ServiceKey::of::<T>())
        {
            return Ok(None);
        }
        self.resolve::<T>().map(Some)
    }

    /// 打开同一容器下的新作用域（与当前作用域平级，而非嵌套）
    pub fn open_scope(&self) -> Scope {
        self.container().open_scope()
    }

    /// 获取作用域附加状态，不存在时创建
    pub fn state_or_insert_with<S, F>(&self, init: F) -> Result<Arc<S>, DependencyError>
    where
        S: Send + Sync + 'static,
        F: FnOnce() -> S,
    {
        let context: &dyn ScopeContext = self.inner.as_ref();
        context.state_or_insert_with(init)
    }

    /// 释放作用域，重复调用无效果
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl ScopeContext for Scope {
    fn id(&self) -> Uuid {
        self.inner.id
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    fn state_entry(&self, key: TypeId) -> Option<AnyInstance> {
        self.inner.state_entry(key)
    }

    fn state_entry_or_insert(
        &self,
        key: TypeId,
        init: &mut dyn FnMut() -> AnyInstance,
    ) -> Result<AnyInstance, DependencyError> {
        self.inner.state_entry_or_insert(key, init)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("opened_at", &self.inner.opened_at)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

//! 类型化选项
//!
//! 同一配置节可以用三种方式读取：
//!
//! - [`CachedOptions`] 在获取时绑定一次，之后不随配置变化
//! - [`ScopedOptions`] 每个作用域绑定一次，使用作用域打开时的快照
//! - [`LiveOptions`] 每次读取都从当前快照重新绑定

use crate::binder::ConfigBinder;
use crate::notifier::{ChangeNotifier, Subscription};
use crate::source::ConfigurationSource;
use hearth_common::DependencyError;
use hearth_config_abstractions::{fold_key, BindOptions, BindOutcome, ConfigurationSnapshot};
use hearth_di_abstractions::{AnyInstance, ScopeContext, ScopeListener};
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// 作用域内的选项缓存
///
/// 保存在作用域的附加状态中，随作用域释放。
struct ScopedOptionsCache {
    snapshot: Arc<ConfigurationSnapshot>,
    values: Mutex<HashMap<(TypeId, String), AnyInstance>>,
}

impl ScopedOptionsCache {
    fn new(snapshot: Arc<ConfigurationSnapshot>) -> Self {
        Self {
            snapshot,
            values: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_bind<T: BindOptions>(&self, section: &str) -> Arc<BindOutcome<T>> {
        let key = (TypeId::of::<T>(), fold_key(section));
        let mut values = self.values.lock();

        if let Some(outcome) = values
            .get(&key)
            .and_then(|entry| entry.clone().downcast::<BindOutcome<T>>().ok())
        {
            return outcome;
        }

        let outcome = Arc::new(ConfigBinder::bind::<T>(&self.snapshot, section));
        values.insert(key, outcome.clone());
        outcome
    }
}

/// 选项提供者
pub struct OptionsProvider {
    source: Arc<ConfigurationSource>,
    notifier: Arc<ChangeNotifier>,
}

impl OptionsProvider {
    /// 创建选项提供者
    pub fn new(source: Arc<ConfigurationSource>, notifier: Arc<ChangeNotifier>) -> Self {
        Self { source, notifier }
    }

    /// 配置源
    pub fn source(&self) -> &Arc<ConfigurationSource> {
        &self.source
    }

    /// 变更通知器
    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// 从当前快照绑定一次，返回的句柄不随配置变化
    pub fn get_cached<T: BindOptions>(&self, section: &str) -> CachedOptions<T> {
        let snapshot = self.source.snapshot();
        debug!(
            "绑定缓存选项: {} <- {} (代数 {})",
            std::any::type_name::<T>(),
            section,
            snapshot.generation()
        );
        CachedOptions {
            outcome: Arc::new(ConfigBinder::bind(&snapshot, section)),
        }
    }

    /// 每个作用域绑定一次
    ///
    /// 使用作用域打开时固定的快照；作用域未经提供者登记（没有固定快照）时，
    /// 以首次访问时的当前快照为准。作用域已释放时返回错误。
    pub fn get_scoped_cached<T: BindOptions>(
        &self,
        scope: &dyn ScopeContext,
        section: &str,
    ) -> Result<ScopedOptions<T>, DependencyError> {
        if scope.is_disposed() {
            return Err(DependencyError::ScopeDisposed {
                scope_id: scope.id(),
            });
        }

        let cache = scope
            .state_or_insert_with(|| ScopedOptionsCache::new(self.source.snapshot()))?;
        trace!(
            "读取作用域选项: {} <- {} (作用域 {}, 代数 {})",
            std::any::type_name::<T>(),
            section,
            scope.id(),
            cache.snapshot.generation()
        );
        Ok(ScopedOptions {
            outcome: cache.get_or_bind(section),
            scope_id: scope.id(),
        })
    }

    /// 实时选项，每次读取都从当前快照重新绑定
    pub fn get_live<T: BindOptions>(&self, section: &str) -> LiveOptions<T> {
        LiveOptions {
            section: section.to_string(),
            source: self.source.clone(),
            notifier: self.notifier.clone(),
            _marker: PhantomData,
        }
    }
}

impl ScopeListener for OptionsProvider {
    fn on_scope_opened(&self, scope: &dyn ScopeContext) {
        let snapshot = self.source.snapshot();
        let generation = snapshot.generation();
        match scope.state_or_insert_with(|| ScopedOptionsCache::new(snapshot)) {
            Ok(_) => trace!("作用域 {} 固定配置快照, 代数 {}", scope.id(), generation),
            Err(err) => debug!("无法固定作用域配置快照: {}", err),
        }
    }
}

impl fmt::Debug for OptionsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsProvider")
            .field("source", &self.source.path())
            .field("generation", &self.source.generation())
            .finish()
    }
}

/// 缓存选项
pub struct CachedOptions<T> {
    outcome: Arc<BindOutcome<T>>,
}

impl<T> CachedOptions<T> {
    /// 选项值
    pub fn value(&self) -> &T {
        self.outcome.value()
    }

    /// 绑定结果
    pub fn outcome(&self) -> &BindOutcome<T> {
        &self.outcome
    }

    /// 是否有字段绑定失败
    pub fn is_degraded(&self) -> bool {
        self.outcome.is_degraded()
    }

    /// 绑定所用快照的代数
    pub fn generation(&self) -> u64 {
        self.outcome.generation()
    }
}

impl<T> Clone for CachedOptions<T> {
    fn clone(&self) -> Self {
        Self {
            outcome: self.outcome.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CachedOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedOptions")
            .field("value", self.value())
            .field("generation", &self.generation())
            .finish()
    }
}

/// 作用域选项
pub struct ScopedOptions<T> {
    outcome: Arc<BindOutcome<T>>,
    scope_id: uuid::Uuid,
}

impl<T> ScopedOptions<T> {
    /// 选项值
    pub fn value(&self) -> &T {
        self.outcome.value()
    }

    /// 绑定结果
    pub fn outcome(&self) -> &BindOutcome<T> {
        &self.outcome
    }

    /// 是否有字段绑定失败
    pub fn is_degraded(&self) -> bool {
        self.outcome.is_degraded()
    }

    /// 绑定所用快照的代数
    pub fn generation(&self) -> u64 {
        self.outcome.generation()
    }

    /// 所属作用域ID
    pub fn scope_id(&self) -> uuid::Uuid {
        self.scope_id
    }
}

impl<T> Clone for ScopedOptions<T> {
    fn clone(&self) -> Self {
        Self {
            outcome: self.outcome.clone(),
            scope_id: self.scope_id,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ScopedOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedOptions")
            .field("value", self.value())
            .field("generation", &self.generation())
            .field("scope_id", &self.scope_id)
            .finish()
    }
}

/// 实时选项
pub struct LiveOptions<T> {
    section: String,
    source: Arc<ConfigurationSource>,
    notifier: Arc<ChangeNotifier>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: BindOptions> LiveOptions<T> {
    /// 配置节名称
    pub fn section(&self) -> &str {
        &self.section
    }

    /// 从当前快照绑定得到的值
    pub fn value(&self) -> T {
        self.current().into_value()
    }

    /// 从当前快照绑定
    pub fn current(&self) -> BindOutcome<T> {
        ConfigBinder::bind(&self.source.snapshot(), &self.section)
    }

    /// 配置节发生变化时以新值调用回调
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let section = self.section.clone();
        self.notifier.subscribe_with_event(move |event, snapshot| {
            if !event.touches_section(&section) {
                return;
            }
            let outcome = ConfigBinder::bind::<T>(snapshot, &section);
            callback(outcome.value());
        })
    }
}

impl<T> Clone for LiveOptions<T> {
    fn clone(&self) -> Self {
        Self {
            section: self.section.clone(),
            source: self.source.clone(),
            notifier: self.notifier.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for LiveOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveOptions")
            .field("type", &std::any::type_name::<T>())
            .field("section", &self.section)
            .field("generation", &self.source.generation())
            .finish()
    }
}

//! 应用主入口

use crate::builder::HearthAppBuilder;
use chrono::{DateTime, Utc};
use hearth_common::DependencyError;
use hearth_config::{
    BindOptions, ChangeNotifier, ConfigChangeEvent, ConfigFileWatcher, ConfigurationSnapshot,
    ConfigurationSource, OptionsProvider, SnapshotObserver,
};
use hearth_di::{Container, Scope};
use hearth_di_abstractions::{ScopeContext, ScopeListener};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, trace};

/// 应用运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppStatus {
    /// 运行中
    Running,
    /// 已停止
    Stopped,
}

/// 应用统计信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetrics {
    /// 启动时间
    pub start_time: DateTime<Utc>,
    /// 停止时间
    pub stop_time: Option<DateTime<Utc>>,
    /// 注册的服务数量
    pub registered_services_count: usize,
    /// 已打开的作用域数量
    pub scopes_opened: u64,
    /// 产生变更的配置重载次数
    pub config_reload_count: u64,
}

impl AppMetrics {
    /// 计算运行时间
    pub fn uptime(&self) -> chrono::Duration {
        self.stop_time.unwrap_or_else(Utc::now) - self.start_time
    }
}

/// 应用活动计数
///
/// 作为作用域监听器和快照观察者登记，经任何途径打开的作用域
/// 和产生变更的重新加载（包括文件监控触发的）都会被计入。
#[derive(Debug, Default)]
pub(crate) struct AppActivity {
    scopes_opened: AtomicU64,
    config_reloads: AtomicU64,
}

impl ScopeListener for AppActivity {
    fn on_scope_opened(&self, scope: &dyn ScopeContext) {
        let opened = self.scopes_opened.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("作用域 {} 已打开，累计 {} 个", scope.id(), opened);
    }
}

impl SnapshotObserver for AppActivity {
    fn on_snapshot_changed(&self, event: &ConfigChangeEvent, _snapshot: &Arc<ConfigurationSnapshot>) {
        let reloads = self.config_reloads.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("配置代数 {} 生效，累计重载 {} 次", event.generation, reloads);
    }
}

/// Hearth 应用
///
/// 持有容器、配置源、选项提供者、变更通知器和可选的文件监控器。
pub struct HearthApp {
    container: Container,
    source: Arc<ConfigurationSource>,
    notifier: Arc<ChangeNotifier>,
    options: Arc<OptionsProvider>,
    watcher: Option<ConfigFileWatcher>,
    activity: Arc<AppActivity>,
    status: RwLock<AppStatus>,
    metrics: RwLock<AppMetrics>,
}

impl HearthApp {
    /// 创建应用构建器
    pub fn builder() -> HearthAppBuilder {
        HearthAppBuilder::new()
    }

    pub(crate) fn new(
        container: Container,
        source: Arc<ConfigurationSource>,
        notifier: Arc<ChangeNotifier>,
        options: Arc<OptionsProvider>,
        watcher: Option<ConfigFileWatcher>,
        activity: Arc<AppActivity>,
    ) -> Self {
        let metrics = AppMetrics {
            start_time: Utc::now(),
            stop_time: None,
            registered_services_count: container.keys().len(),
            scopes_opened: 0,
            config_reload_count: 0,
        };
        Self {
            container,
            source,
            notifier,
            options,
            watcher,
            activity,
            status: RwLock::new(AppStatus::Running),
            metrics: RwLock::new(metrics),
        }
    }

    /// 根容器
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// 从根容器解析服务
    pub fn resolve<T>(&self) -> Result<Arc<T>, DependencyError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container.resolve::<T>()
    }

    /// 打开新的作用域
    pub fn open_scope(&self) -> Scope {
        self.container.open_scope()
    }

    /// 选项提供者
    pub fn options(&self) -> &Arc<OptionsProvider> {
        &self.options
    }

    /// 读取实时选项值
    pub fn live_value<T: BindOptions>(&self, section: &str) -> T {
        self.options.get_live::<T>(section).value()
    }

    /// 变更通知器
    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// 配置源
    pub fn configuration_source(&self) -> &Arc<ConfigurationSource> {
        &self.source
    }

    /// 当前配置快照
    pub fn configuration(&self) -> Arc<ConfigurationSnapshot> {
        self.source.snapshot()
    }

    /// 是否启用了文件监控
    pub fn is_hot_reload_active(&self) -> bool {
        self.watcher
            .as_ref()
            .is_some_and(ConfigFileWatcher::is_watching)
    }

    /// 重新加载配置，内容变化时返回 `true`
    pub fn reload_configuration(&self) -> bool {
        self.source.reload()
    }

    /// 运行状态
    pub fn status(&self) -> AppStatus {
        *self.status.read()
    }

    /// 统计信息
    pub fn metrics(&self) -> AppMetrics {
        let mut metrics = self.metrics.read().clone();
        metrics.scopes_opened = self.activity.scopes_opened.load(Ordering::Relaxed);
        metrics.config_reload_count = self.activity.config_reloads.load(Ordering::Relaxed);
        metrics
    }

    /// 停止应用：停止文件监控，之后不再自动重新加载
    ///
    /// 已打开的作用域由各自的持有者释放。重复调用无效果。
    pub fn shutdown(&self) {
        {
            let mut status = self.status.write();
            if *status == AppStatus::Stopped {
                return;
            }
            *status = AppStatus::Stopped;
        }
        info!("停止应用");

        if let Some(watcher) = &self.watcher {
            watcher.stop();
        }
        self.metrics.write().stop_time = Some(Utc::now());

        info!("应用已停止");
    }
}

impl std::fmt::Debug for HearthApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HearthApp")
            .field("container", &self.container)
            .field("source", &self.source)
            .field("status", &self.status())
            .field("hot_reload", &self.is_hot_reload_active())
            .finish()
    }
}

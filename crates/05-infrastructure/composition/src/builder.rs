//! 应用构建器

use crate::app::{AppActivity, HearthApp};
use crate::logging::LoggingConfig;
use hearth_common::{DependencyError, InfrastructureError};
use hearth_config::{
    BindOptions, CachedOptions, ChangeNotifier, ConfigFileWatcher, ConfigurationFileReader,
    ConfigurationSource, LiveOptions, OptionsProvider, ScopedOptions, SnapshotObserver,
};
use hearth_di::{ContainerBuilder, ServiceRegistry};
use hearth_di_abstractions::{
    AssemblyProvider, ContainerOptions, ScopeListener, ServiceDescriptor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 未指定配置文件时使用的路径
pub const DEFAULT_CONFIG_FILE: &str = "appsettings.json";

/// 应用构建器
///
/// 显式组装容器、配置源和选项，构建结果由调用方持有，不提供全局访问点。
pub struct HearthAppBuilder {
    config_path: Option<PathBuf>,
    reader: Option<Arc<dyn ConfigurationFileReader>>,
    hot_reload: bool,
    registry: ServiceRegistry,
    listeners: Vec<Arc<dyn ScopeListener>>,
    container_options: ContainerOptions,
    logging: Option<LoggingConfig>,
}

impl HearthAppBuilder {
    /// 创建构建器
    pub fn new() -> Self {
        Self {
            config_path: None,
            reader: None,
            hot_reload: false,
            registry: ServiceRegistry::new(),
            listeners: Vec::new(),
            container_options: ContainerOptions::default(),
            logging: None,
        }
    }

    /// 指定配置文件，读取器按扩展名选择
    #[must_use]
    pub fn with_configuration_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// 指定配置读取器
    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn ConfigurationFileReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// 启用配置热重载
    #[must_use]
    pub fn hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    /// 配置日志，构建时安装全局订阅器
    #[must_use]
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 设置容器配置
    #[must_use]
    pub fn with_container_options(mut self, options: ContainerOptions) -> Self {
        self.container_options = options;
        self
    }

    /// 把配置节绑定为选项类型
    ///
    /// 注册 `CachedOptions<T>`（单例）、`ScopedOptions<T>`（作用域）
    /// 和 `LiveOptions<T>`（单例）三种选项服务。
    #[must_use]
    pub fn configure<T: BindOptions>(mut self, section: impl Into<String>) -> Self {
        let section: Arc<str> = Arc::from(section.into());
        debug!("配置选项: {} <- {}", std::any::type_name::<T>(), section);

        let cached_section = section.clone();
        self.registry.register(
            ServiceDescriptor::singleton::<CachedOptions<T>, _>(move |resolver| {
                let provider = resolver.resolve::<OptionsProvider>()?;
                Ok(Arc::new(provider.get_cached::<T>(&cached_section)))
            })
            .depends_on::<OptionsProvider>(),
        );

        let scoped_section = section.clone();
        self.registry.register(
            ServiceDescriptor::scoped::<ScopedOptions<T>, _>(move |resolver| {
                let provider = resolver.resolve::<OptionsProvider>()?;
                let scope = resolver
                    .current_scope()
                    .ok_or_else(|| DependencyError::ScopeRequired {
                        type_name: std::any::type_name::<ScopedOptions<T>>().to_string(),
                    })?;
                Ok(Arc::new(provider.get_scoped_cached::<T>(scope, &scoped_section)?))
            })
            .depends_on::<OptionsProvider>(),
        );

        self.registry.register(
            ServiceDescriptor::singleton::<LiveOptions<T>, _>(move |resolver| {
                let provider = resolver.resolve::<OptionsProvider>()?;
                Ok(Arc::new(provider.get_live::<T>(&section)))
            })
            .depends_on::<OptionsProvider>(),
        );
        self
    }

    /// 扫描程序集
    #[must_use]
    pub fn scan_assembly(mut self, assembly: &dyn AssemblyProvider) -> Self {
        let added = self.registry.scan_assembly(assembly);
        info!("扫描程序集 {}: {} 项注册", assembly.name(), added);
        self
    }

    /// 扫描程序集及其引用的程序集
    #[must_use]
    pub fn scan_assembly_and_referenced(mut self, assembly: &dyn AssemblyProvider) -> Self {
        let added = self.registry.scan_assembly_and_referenced(assembly);
        info!("扫描程序集 {} 及其引用: {} 项注册", assembly.name(), added);
        self
    }

    /// 显式注册服务
    #[must_use]
    pub fn register(mut self, descriptor: impl Into<ServiceDescriptor>) -> Self {
        self.registry.register(descriptor);
        self
    }

    /// 登记作用域监听器
    #[must_use]
    pub fn with_scope_listener(mut self, listener: Arc<dyn ScopeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 构建应用
    pub fn build(self) -> Result<HearthApp, InfrastructureError> {
        if let Some(logging) = &self.logging {
            logging.init()?;
        }
        info!("开始构建应用");

        let source = Arc::new(match (self.config_path, self.reader) {
            (Some(path), Some(reader)) => ConfigurationSource::load(path, reader),
            (Some(path), None) => ConfigurationSource::from_path(path)?,
            (None, Some(reader)) => ConfigurationSource::load(DEFAULT_CONFIG_FILE, reader),
            (None, None) => ConfigurationSource::empty(),
        });
        let notifier = ChangeNotifier::attach(source.clone());
        let options = Arc::new(OptionsProvider::new(source.clone(), notifier.clone()));

        let activity = Arc::new(AppActivity::default());
        let observer: Arc<dyn SnapshotObserver> = activity.clone();
        source.add_observer(Arc::downgrade(&observer));

        let watcher = if self.hot_reload {
            info!("启用配置热重载: {}", source.path().display());
            let watcher = ConfigFileWatcher::new(source.clone());
            match watcher.start() {
                Ok(()) => Some(watcher),
                Err(e) => {
                    warn!("无法启用配置热重载: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let mut registry = self.registry;
        registry
            .register(ServiceDescriptor::instance(source.clone()))
            .register(ServiceDescriptor::instance(notifier.clone()))
            .register(ServiceDescriptor::instance(options.clone()));

        let mut container = ContainerBuilder::new(registry)
            .with_options(self.container_options)
            .with_scope_listener(options.clone())
            .with_scope_listener(activity.clone());
        for listener in self.listeners {
            container = container.with_scope_listener(listener);
        }
        let container = container.build();

        info!("应用构建完成，共 {} 项注册", container.keys().len());
        Ok(HearthApp::new(
            container, source, notifier, options, watcher, activity,
        ))
    }
}

impl Default for HearthAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

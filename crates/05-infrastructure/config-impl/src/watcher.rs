//! 配置文件监控器实现

use crate::source::ConfigurationSource;
use hearth_common::ConfigError;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// 配置文件监控器
///
/// 监控配置文件所在目录（不递归），配置文件被创建、修改或删除时重新加载配置源。
pub struct ConfigFileWatcher {
    source: Arc<ConfigurationSource>,
    watched_dir: PathBuf,
    file_name: Option<OsString>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl ConfigFileWatcher {
    /// 创建监控器，调用 [`start`](Self::start) 后开始监控
    pub fn new(source: Arc<ConfigurationSource>) -> Self {
        let path = source.path();
        let watched_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(ToOwned::to_owned);

        Self {
            source,
            watched_dir,
            file_name,
            watcher: Mutex::new(None),
        }
    }

    /// 开始监控，已在监控时不做任何事
    pub fn start(&self) -> Result<(), ConfigError> {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            warn!("配置监控器已经在运行: {}", self.source.path().display());
            return Ok(());
        }

        let Some(file_name) = self.file_name.clone() else {
            return Err(ConfigError::watch_error(format!(
                "配置路径没有文件名: {}",
                self.source.path().display()
            )));
        };

        let source = Arc::downgrade(&self.source);
        let mut watcher = recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => handle_event(&event, &file_name, &source),
            Err(e) => error!("文件监控错误: {:?}", e),
        })
        .map_err(|e| ConfigError::watch_error(format!("创建文件监控器失败: {}", e)))?;

        watcher
            .watch(&self.watched_dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                ConfigError::watch_error(format!(
                    "添加监控路径失败: {} - {}",
                    self.watched_dir.display(),
                    e
                ))
            })?;

        *slot = Some(watcher);
        info!("启动配置文件监控: {}", self.source.path().display());
        Ok(())
    }

    /// 停止监控
    pub fn stop(&self) {
        if self.watcher.lock().take().is_some() {
            info!("停止配置文件监控: {}", self.source.path().display());
        }
    }

    /// 是否正在监控
    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// 被监控的配置文件路径
    pub fn watched_path(&self) -> &Path {
        self.source.path()
    }
}

fn handle_event(event: &Event, file_name: &OsString, source: &Weak<ConfigurationSource>) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    let touches_config = event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(file_name.as_os_str()));
    if !touches_config {
        return;
    }

    debug!("配置文件事件: {:?}", event.kind);
    match source.upgrade() {
        Some(source) => {
            source.reload();
        }
        None => debug!("配置源已释放，忽略文件事件"),
    }
}

impl Drop for ConfigFileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ConfigFileWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigFileWatcher")
            .field("watched_path", &self.source.path())
            .field("watched_dir", &self.watched_dir)
            .field("is_watching", &self.is_watching())
            .finish()
    }
}

//! 配置源
//!
//! 持有当前配置快照，负责加载和重新加载。快照通过原子指针替换，
//! 并发读取只会看到完整的旧快照或完整的新快照。

use crate::providers::{reader_for_path, MemoryReader};
use arc_swap::ArcSwap;
use hearth_common::ConfigError;
use hearth_config_abstractions::{
    ConfigChangeEvent, ConfigurationFileReader, ConfigurationSnapshot, SnapshotObserver,
};
use parking_lot::{ReentrantMutex, RwLock};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// 初始快照的代数
pub const INITIAL_GENERATION: u64 = 1;

/// 读取结果
enum ReadOutcome {
    Loaded(Value),
    Missing,
    Malformed(ConfigError),
}

/// 配置源
pub struct ConfigurationSource {
    path: PathBuf,
    reader: Arc<dyn ConfigurationFileReader>,
    current: ArcSwap<ConfigurationSnapshot>,
    /// 可重入，观察者回调中再次触发重新加载不会死锁
    reload_lock: ReentrantMutex<()>,
    observers: RwLock<Vec<Weak<dyn SnapshotObserver>>>,
}

impl ConfigurationSource {
    /// 使用指定读取器加载配置
    ///
    /// 配置文件不存在或无法解析时得到空快照，不会失败。
    pub fn load(path: impl Into<PathBuf>, reader: Arc<dyn ConfigurationFileReader>) -> Self {
        let path = path.into();
        let tree = match Self::read(&path, reader.as_ref()) {
            ReadOutcome::Loaded(tree) => Some(tree),
            ReadOutcome::Missing => {
                info!("配置文件不存在，使用空配置: {}", path.display());
                None
            }
            ReadOutcome::Malformed(err) => {
                warn!("配置文件无法解析，使用空配置: {}", err);
                None
            }
        };

        let snapshot = match tree {
            Some(tree) => ConfigurationSnapshot::from_tree(INITIAL_GENERATION, &tree),
            None => ConfigurationSnapshot::empty(INITIAL_GENERATION),
        };
        info!(
            "加载配置: {} ({} 项, 格式 {})",
            path.display(),
            snapshot.len(),
            reader.format()
        );

        Self {
            path,
            reader,
            current: ArcSwap::from_pointee(snapshot),
            reload_lock: ReentrantMutex::new(()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// 按文件扩展名选择读取器并加载配置
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let reader = reader_for_path(path)?;
        Ok(Self::load(path, reader))
    }

    /// 从内存中的配置树创建配置源
    pub fn in_memory(tree: Value) -> Self {
        Self::load("<memory>", Arc::new(MemoryReader::new(Some(tree))))
    }

    /// 空配置源
    pub fn empty() -> Self {
        Self::load("<empty>", Arc::new(MemoryReader::new(None)))
    }

    fn read(path: &Path, reader: &dyn ConfigurationFileReader) -> ReadOutcome {
        match reader.read(path) {
            Ok(Some(tree)) => ReadOutcome::Loaded(tree),
            Ok(None) => ReadOutcome::Missing,
            Err(err) => ReadOutcome::Malformed(err),
        }
    }

    /// 配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<ConfigurationSnapshot> {
        self.current.load_full()
    }

    /// 当前快照代数
    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    /// 登记快照观察者
    pub fn add_observer(&self, observer: Weak<dyn SnapshotObserver>) {
        self.observers.write().push(observer);
    }

    /// 重新加载配置
    ///
    /// 内容发生变化时以新代数替换快照、通知观察者并返回 `true`；
    /// 内容未变化或文件无法解析（保留原快照）时返回 `false`。
    /// 文件被删除视为变更为空配置。多个重新加载调用依次执行。
    pub fn reload(&self) -> bool {
        let _guard = self.reload_lock.lock();

        let tree = match Self::read(&self.path, self.reader.as_ref()) {
            ReadOutcome::Loaded(tree) => Some(tree),
            ReadOutcome::Missing => None,
            ReadOutcome::Malformed(err) => {
                warn!("重新加载配置失败，保留当前配置: {}", err);
                return false;
            }
        };

        let previous = self.current.load_full();
        let generation = previous.generation() + 1;
        let next = match tree {
            Some(tree) => ConfigurationSnapshot::from_tree(generation, &tree),
            None => ConfigurationSnapshot::empty(generation),
        };

        if next.same_content(&previous) {
            debug!("配置内容未变化: {}", self.path.display());
            return false;
        }

        let next = Arc::new(next);
        let event = ConfigChangeEvent::between(&previous, &next, self.path.display().to_string());
        self.current.store(next.clone());
        info!(
            "配置已重新加载: {} (代数 {} -> {}, 变更 {} 项)",
            self.path.display(),
            event.previous_generation,
            event.generation,
            event.changed_keys.len()
        );

        self.notify_observers(&event, &next);
        true
    }

    fn notify_observers(&self, event: &ConfigChangeEvent, snapshot: &Arc<ConfigurationSnapshot>) {
        let observers: Vec<Arc<dyn SnapshotObserver>> = {
            let mut observers = self.observers.write();
            observers.retain(|observer| observer.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };

        for observer in observers {
            observer.on_snapshot_changed(event, snapshot);
        }
    }
}

impl fmt::Debug for ConfigurationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationSource")
            .field("path", &self.path)
            .field("format", &self.reader.format())
            .field("generation", &self.generation())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

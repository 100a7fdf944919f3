//! 配置变更通知

use crate::source::ConfigurationSource;
use hearth_config_abstractions::{ConfigChangeEvent, ConfigurationSnapshot, SnapshotObserver};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

type ChangeCallback = dyn Fn(&ConfigChangeEvent, &ConfigurationSnapshot) + Send + Sync;

struct Subscriber {
    id: u64,
    alive: Arc<AtomicBool>,
    callback: Arc<ChangeCallback>,
}

#[derive(Default)]
struct NotifierInner {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl NotifierInner {
    fn remove(&self, id: u64) {
        self.subscribers.write().retain(|subscriber| subscriber.id != id);
    }
}

/// 配置变更通知器
///
/// 作为快照观察者挂在配置源上，每次重新加载产生变更后按订阅顺序调用回调。
/// 回调在触发重新加载的线程上执行。
pub struct ChangeNotifier {
    source: Arc<ConfigurationSource>,
    inner: Arc<NotifierInner>,
}

impl ChangeNotifier {
    /// 创建通知器并登记到配置源
    pub fn attach(source: Arc<ConfigurationSource>) -> Arc<Self> {
        let notifier = Arc::new(Self {
            source: source.clone(),
            inner: Arc::new(NotifierInner::default()),
        });
        let observer: Arc<dyn SnapshotObserver> = notifier.clone();
        source.add_observer(Arc::downgrade(&observer));
        notifier
    }

    /// 订阅配置变更，回调参数为新快照
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ConfigurationSnapshot) + Send + Sync + 'static,
    {
        self.subscribe_with_event(move |_, snapshot| callback(snapshot))
    }

    /// 订阅配置变更，回调同时得到变更事件
    pub fn subscribe_with_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ConfigChangeEvent, &ConfigurationSnapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let alive = Arc::new(AtomicBool::new(true));
        self.inner.subscribers.write().push(Subscriber {
            id,
            alive: alive.clone(),
            callback: Arc::new(callback),
        });
        debug!("新增配置变更订阅: {}", id);

        Subscription {
            id,
            alive,
            notifier: Arc::downgrade(&self.inner),
        }
    }

    /// 当前订阅数量
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// 关联的配置源
    pub fn source(&self) -> &Arc<ConfigurationSource> {
        &self.source
    }

    /// 重新加载配置，内容变化时通知订阅者
    pub fn reload(&self) -> bool {
        self.source.reload()
    }

    fn dispatch(&self, event: &ConfigChangeEvent, snapshot: &ConfigurationSnapshot) {
        // 复制订阅列表，回调中可以安全地订阅或取消订阅
        let subscribers: Vec<(u64, Arc<AtomicBool>, Arc<ChangeCallback>)> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|s| (s.id, s.alive.clone(), s.callback.clone()))
            .collect();

        for (id, alive, callback) in subscribers {
            // 在本轮通知中途取消的订阅不再被调用
            if !alive.load(Ordering::Acquire) {
                continue;
            }
            trace!("通知配置变更订阅: {} (代数 {})", id, event.generation);
            callback(event, snapshot);
        }
    }
}

impl SnapshotObserver for ChangeNotifier {
    fn on_snapshot_changed(&self, event: &ConfigChangeEvent, snapshot: &Arc<ConfigurationSnapshot>) {
        self.dispatch(event, snapshot);
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("source", &self.source.path())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// 配置变更订阅
///
/// 释放（或被丢弃）后回调不再被调用。
#[must_use = "丢弃订阅会立即取消订阅"]
pub struct Subscription {
    id: u64,
    alive: Arc<AtomicBool>,
    notifier: Weak<NotifierInner>,
}

impl Subscription {
    /// 订阅ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 订阅是否有效
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::Acquire) && self.notifier.strong_count() > 0
    }

    /// 取消订阅，可重复调用
    pub fn dispose(&self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.notifier.upgrade() {
            inner.remove(self.id);
        }
        debug!("取消配置变更订阅: {}", self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

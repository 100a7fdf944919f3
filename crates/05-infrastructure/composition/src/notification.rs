//! 宿主通知桥接
//!
//! 配置变更回调在触发重新加载的线程上同步执行，而宿主通知通常是异步的。
//! [`NotificationBridge`] 通过通道把通知交给 tokio 任务逐条投递。

use async_trait::async_trait;
use hearth_config::{ChangeNotifier, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 宿主界面通知接口
#[async_trait]
pub trait UiHostNotifier: Send + Sync {
    /// 向用户显示通知
    async fn notify(&self, title: &str, message: &str);
}

/// 待投递的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostNotification {
    /// 标题
    pub title: String,
    /// 内容
    pub message: String,
}

/// 通知发送端，可在任意线程使用
#[derive(Debug, Clone)]
pub struct NotificationSender {
    sender: mpsc::UnboundedSender<HostNotification>,
}

impl NotificationSender {
    /// 发送通知，桥接已关闭时返回 `false`
    pub fn send(&self, title: impl Into<String>, message: impl Into<String>) -> bool {
        let notification = HostNotification {
            title: title.into(),
            message: message.into(),
        };
        if self.sender.send(notification).is_err() {
            warn!("通知桥接已关闭，丢弃通知");
            return false;
        }
        true
    }
}

/// 通知桥接
pub struct NotificationBridge {
    sender: Mutex<Option<NotificationSender>>,
    task: Mutex<Option<JoinHandle<usize>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl NotificationBridge {
    /// 启动投递任务，必须在 tokio 运行时内调用
    pub fn spawn(notifier: Arc<dyn UiHostNotifier>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<HostNotification>();
        let task = tokio::spawn(async move {
            let mut delivered = 0;
            while let Some(notification) = receiver.recv().await {
                debug!("投递宿主通知: {}", notification.title);
                notifier
                    .notify(&notification.title, &notification.message)
                    .await;
                delivered += 1;
            }
            delivered
        });
        info!("通知桥接已启动");

        Self {
            sender: Mutex::new(Some(NotificationSender { sender })),
            task: Mutex::new(Some(task)),
            subscription: Mutex::new(None),
        }
    }

    /// 通知发送端，桥接关闭后返回 `None`
    pub fn sender(&self) -> Option<NotificationSender> {
        self.sender.lock().clone()
    }

    /// 每次配置变更时发送一条通知
    pub fn forward_changes(&self, notifier: &ChangeNotifier, title: impl Into<String>) {
        let Some(sender) = self.sender() else {
            warn!("通知桥接已关闭，忽略配置变更转发");
            return;
        };
        let title = title.into();
        let subscription = notifier.subscribe_with_event(move |event, _| {
            sender.send(
                title.clone(),
                format!(
                    "配置已更新 (代数 {}): {}",
                    event.generation,
                    event.changed_keys.join(", ")
                ),
            );
        });
        if let Some(previous) = self.subscription.lock().replace(subscription) {
            previous.dispose();
        }
    }

    /// 关闭桥接，返回投递总数
    ///
    /// 等待所有发送端释放、已发送的通知投递完成后返回。
    pub async fn shutdown(&self) -> usize {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.dispose();
        }
        self.sender.lock().take();

        let task = self.task.lock().take();
        let Some(task) = task else {
            return 0;
        };
        match task.await {
            Ok(delivered) => {
                info!("通知桥接已关闭，共投递 {} 条通知", delivered);
                delivered
            }
            Err(e) => {
                warn!("通知投递任务异常结束: {}", e);
                0
            }
        }
    }
}

impl std::fmt::Debug for NotificationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBridge")
            .field("open", &self.sender.lock().is_some())
            .field("forwarding", &self.subscription.lock().is_some())
            .finish()
    }
}

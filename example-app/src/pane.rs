//! 选项示例面板
//!
//! 面板逻辑与界面无关：刷新操作返回各种选项的 JSON 文本，配置变化时通过宿主通知显示新值。

use crate::settings::{SampleSettings, SAMPLE_SECTION};
use hearth_common::DependencyError;
use hearth_composition::NotificationSender;
use hearth_config::{CachedOptions, LiveOptions, ScopedOptions, Subscription};
use hearth_di::Container;
use std::sync::Arc;
use tracing::{debug, info};

/// 一次刷新得到的选项文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneValues {
    /// 缓存选项，应用生命周期内不变
    pub options: String,
    /// 实时选项，随配置文件变化
    pub monitor: String,
    /// 作用域选项，同一作用域内不变
    pub snapshot: String,
}

/// 选项示例面板
pub struct OptionsSamplePane {
    container: Container,
    options: Arc<CachedOptions<SampleSettings>>,
    monitor: Arc<LiveOptions<SampleSettings>>,
    subscription: Subscription,
}

impl OptionsSamplePane {
    /// 打开面板并订阅配置变更
    pub fn open(
        container: &Container,
        notifications: NotificationSender,
    ) -> Result<Self, DependencyError> {
        let options = container.resolve::<CachedOptions<SampleSettings>>()?;
        let monitor = container.resolve::<LiveOptions<SampleSettings>>()?;

        let subscription = monitor.on_change(move |settings: &SampleSettings| {
            notifications.send("配置更新", settings.to_pretty_json());
        });
        info!("打开选项示例面板，配置节 {}", SAMPLE_SECTION);

        Ok(Self {
            container: container.clone(),
            options,
            monitor,
            subscription,
        })
    }

    /// 在根容器上刷新
    ///
    /// 根容器没有作用域，作用域选项显示解析错误。
    pub fn refresh_options(&self) -> PaneValues {
        let snapshot = match self.container.resolve::<ScopedOptions<SampleSettings>>() {
            Ok(scoped) => scoped.value().to_pretty_json(),
            Err(e) => format!("<{e}>"),
        };

        PaneValues {
            options: self.options.value().to_pretty_json(),
            monitor: self.monitor.value().to_pretty_json(),
            snapshot,
        }
    }

    /// 在新打开的作用域中刷新
    pub fn refresh_scope_options(&self) -> Result<PaneValues, DependencyError> {
        let scope = self.container.open_scope();
        debug!("刷新作用域选项, 作用域 {}", scope.id());

        let values = (|| -> Result<PaneValues, DependencyError> {
            let options = scope.resolve::<CachedOptions<SampleSettings>>()?;
            let monitor = scope.resolve::<LiveOptions<SampleSettings>>()?;
            let snapshot = scope.resolve::<ScopedOptions<SampleSettings>>()?;
            Ok(PaneValues {
                options: options.value().to_pretty_json(),
                monitor: monitor.value().to_pretty_json(),
                snapshot: snapshot.value().to_pretty_json(),
            })
        })();

        scope.dispose();
        values
    }

    /// 关闭面板，取消配置变更订阅
    pub fn close(self) {
        self.subscription.dispose();
        info!("关闭选项示例面板");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sample_assembly;
    use hearth_composition::{HearthApp, NotificationBridge, UiHostNotifier};
    use hearth_config::MemoryReader;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inbox(Mutex<Vec<String>>);

    #[async_trait::async_trait]
    impl UiHostNotifier for Inbox {
        async fn notify(&self, _title: &str, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn sample(value1: &str) -> serde_json::Value {
        json!({"Sample": {"Value1": value1, "Value2": 123, "Value3": 1.5, "Value4": ["a"]}})
    }

    /// 测试面板刷新体现三种选项语义，配置变化时发出通知
    #[tokio::test]
    async fn test_pane_refresh_and_change_notification() {
        let reader = Arc::new(MemoryReader::new(Some(sample("asd"))));
        let app = HearthApp::builder()
            .with_reader(reader.clone())
            .configure::<SampleSettings>(SAMPLE_SECTION)
            .scan_assembly(&sample_assembly())
            .build()
            .unwrap();

        let inbox = Arc::new(Inbox::default());
        let bridge = NotificationBridge::spawn(inbox.clone());
        let pane = OptionsSamplePane::open(app.container(), bridge.sender().unwrap()).unwrap();

        let before = pane.refresh_options();
        assert!(before.options.contains("\"asd\""));
        assert!(before.snapshot.starts_with('<'));

        reader.set(Some(sample("zxc")));
        assert!(app.reload_configuration());

        let after = pane.refresh_options();
        assert!(after.options.contains("\"asd\""));
        assert!(after.monitor.contains("\"zxc\""));

        let scoped = pane.refresh_scope_options().unwrap();
        assert!(scoped.snapshot.contains("\"zxc\""));
        assert!(scoped.options.contains("\"asd\""));

        pane.close();
        assert_eq!(bridge.shutdown().await, 1);
        assert!(inbox.0.lock().unwrap()[0].contains("\"Value1\": \"zxc\""));
    }
}

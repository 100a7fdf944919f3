//! 控制台宿主通知

use async_trait::async_trait;
use hearth_composition::UiHostNotifier;

/// 把宿主通知打印到标准输出
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl UiHostNotifier for ConsoleNotifier {
    async fn notify(&self, title: &str, message: &str) {
        println!("[{title}]");
        println!("{message}");
    }
}

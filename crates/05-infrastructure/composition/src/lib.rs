//! # Hearth Composition
//!
//! 组合层，把服务容器、配置源、类型化选项和变更通知组装成可运行的应用。
//!
//! ## 主要功能
//!
//! - **应用构建器**: 显式注册服务、扫描程序集、绑定选项
//! - **配置热重载**: 监控配置文件并通知订阅者
//! - **宿主通知桥接**: 把配置变更转发给异步的宿主通知接口
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use hearth_composition::HearthApp;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = HearthApp::builder()
//!         .with_configuration_file("appsettings.json")
//!         .hot_reload(true)
//!         .build()?;
//!
//!     let scope = app.open_scope();
//!     println!("作用域: {}", scope.id());
//!     scope.dispose();
//!
//!     app.shutdown();
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod builder;
pub mod logging;
pub mod notification;

pub use app::{AppMetrics, AppStatus, HearthApp};
pub use builder::{HearthAppBuilder, DEFAULT_CONFIG_FILE};
pub use logging::{init_tracing, LoggingConfig};
pub use notification::{HostNotification, NotificationBridge, NotificationSender, UiHostNotifier};

pub use hearth_common::InfrastructureError;

#[cfg(test)]
mod tests;

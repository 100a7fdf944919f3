//! # Hearth 示例插件
//!
//! 演示服务扫描注册、构造函数注入，以及缓存、作用域和实时三种选项的区别。

mod console;
mod pane;
mod services;
mod settings;

use anyhow::Context;
use clap::Parser;
use console::ConsoleNotifier;
use hearth_composition::{init_tracing, HearthApp, NotificationBridge};
use pane::OptionsSamplePane;
use services::{sample_assembly, HearthHelloService, TestLogService};
use settings::{SampleSettings, SAMPLE_SECTION};
use std::sync::Arc;
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "hearth-sample-app")]
#[command(about = "Hearth 示例插件")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config/appsettings.json")]
    config: String,

    /// 是否启用热重载
    #[arg(long)]
    hot_reload: bool,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    info!("启动 Hearth 示例插件");

    let app = HearthApp::builder()
        .with_configuration_file(&args.config)
        .hot_reload(args.hot_reload)
        .configure::<SampleSettings>(SAMPLE_SECTION)
        .scan_assembly(&sample_assembly())
        .build()?;

    let bridge = NotificationBridge::spawn(Arc::new(ConsoleNotifier));
    let notifications = bridge.sender().context("通知桥接未启动")?;

    // 菜单按钮
    for greeting in app.resolve::<dyn HearthHelloService>()?.say_hello() {
        notifications.send("HearthHelloService", greeting);
    }
    app.resolve::<TestLogService>()?.write_log();

    let pane = OptionsSamplePane::open(app.container(), notifications.clone())?;
    show("根容器", &pane.refresh_options());
    show("作用域", &pane.refresh_scope_options()?);

    info!("修改配置文件 {} 观察变化，按 Ctrl+C 退出", args.config);
    tokio::signal::ctrl_c().await?;

    show("根容器", &pane.refresh_options());
    show("作用域", &pane.refresh_scope_options()?);

    pane.close();
    drop(notifications);
    app.shutdown();
    bridge.shutdown().await;

    info!("示例插件已关闭");
    Ok(())
}

fn show(label: &str, values: &pane::PaneValues) {
    info!("[{}] Options: {}", label, values.options);
    info!("[{}] Monitor: {}", label, values.monitor);
    info!("[{}] Snapshot: {}", label, values.snapshot);
}

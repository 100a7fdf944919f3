//! 组合层端到端测试：容器生命周期、三种选项语义和配置变更通知

use async_trait::async_trait;
use hearth_common::{DependencyError, Disposable, Lifetime};
use hearth_composition::{HearthApp, NotificationBridge, UiHostNotifier};
use hearth_config::{
    BindOptions, CachedOptions, LiveOptions, OptionsSchema, ScopedOptions,
};
use hearth_di_abstractions::{
    Injectable, ServiceDescriptor, ServiceResolver, StaticAssembly, TypeDescriptor,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

#[derive(Debug, Clone, Default, PartialEq)]
struct SampleSettings {
    value1: String,
    value2: i32,
}

impl BindOptions for SampleSettings {
    fn schema() -> OptionsSchema<Self> {
        OptionsSchema::new()
            .field("Value1", |s: &mut Self, v: String| s.value1 = v)
            .field("Value2", |s: &mut Self, v: i32| s.value2 = v)
    }
}

fn write_sample(path: &Path, value1: &str) {
    let content = serde_json::json!({"Sample": {"Value1": value1, "Value2": 123}});
    std::fs::write(path, content.to_string()).unwrap();
}

fn build_app(path: &Path) -> HearthApp {
    HearthApp::builder()
        .with_configuration_file(path)
        .configure::<SampleSettings>("Sample")
        .build()
        .unwrap()
}

/// 文件句柄式的作用域服务，记录释放次数
struct LayerCursor {
    released: Arc<AtomicUsize>,
}

impl Disposable for LayerCursor {
    fn dispose(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// 测试单例在并发首次解析时只构造一次
#[tokio::test]
async fn test_concurrent_singleton_constructed_once() {
    struct Catalog;

    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = constructed.clone();
    let app = HearthApp::builder()
        .register(ServiceDescriptor::singleton::<Catalog, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(Catalog))
        }))
        .build()
        .unwrap();

    let barrier = Barrier::new(8);
    let instances: Vec<Arc<Catalog>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    app.resolve::<Catalog>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
}

/// 测试作用域服务在作用域内共享、作用域间隔离，释放幂等
#[tokio::test]
async fn test_scoped_lifetime_and_idempotent_dispose() {
    let released = Arc::new(AtomicUsize::new(0));
    let tracker = released.clone();
    let app = HearthApp::builder()
        .register(
            ServiceDescriptor::scoped::<LayerCursor, _>(move |_| {
                Ok(Arc::new(LayerCursor {
                    released: tracker.clone(),
                }))
            })
            .disposable(),
        )
        .build()
        .unwrap();

    assert!(matches!(
        app.resolve::<LayerCursor>(),
        Err(DependencyError::ScopeRequired { .. })
    ));

    let scope_a = app.open_scope();
    let scope_b = app.open_scope();
    let a1 = scope_a.resolve::<LayerCursor>().unwrap();
    let a2 = scope_a.resolve::<LayerCursor>().unwrap();
    let b1 = scope_b.resolve::<LayerCursor>().unwrap();
    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b1));

    scope_a.dispose();
    scope_a.dispose();
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(matches!(
        scope_a.resolve::<LayerCursor>(),
        Err(DependencyError::ScopeDisposed { .. })
    ));

    drop(b1);
    scope_b.dispose();
    assert_eq!(released.load(Ordering::SeqCst), 2);
}

/// 测试缓存、实时和作用域三种选项在文件重新加载前后的表现
#[tokio::test]
async fn test_options_semantics_across_file_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appsettings.json");
    write_sample(&path, "asd");
    let app = build_app(&path);

    let cached = app.resolve::<CachedOptions<SampleSettings>>().unwrap();
    let live = app.resolve::<LiveOptions<SampleSettings>>().unwrap();
    let scope_a = app.open_scope();
    let scoped_a = scope_a.resolve::<ScopedOptions<SampleSettings>>().unwrap();
    assert_eq!(cached.value().value1, "asd");
    assert_eq!(cached.value().value2, 123);
    assert_eq!(scoped_a.value().value1, "asd");

    write_sample(&path, "zxc");
    assert!(app.reload_configuration());

    assert_eq!(cached.value().value1, "asd");
    assert_eq!(live.value().value1, "zxc");
    assert_eq!(
        scope_a
            .resolve::<ScopedOptions<SampleSettings>>()
            .unwrap()
            .value()
            .value1,
        "asd"
    );

    let scope_b = app.open_scope();
    let scoped_b = scope_b.resolve::<ScopedOptions<SampleSettings>>().unwrap();
    assert_eq!(scoped_b.value().value1, "zxc");
}

/// 测试订阅在两次变更后释放，第三次变更不再触发
#[tokio::test]
async fn test_subscription_fires_exactly_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appsettings.json");
    write_sample(&path, "v1");
    let app = build_app(&path);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let subscription = app.notifier().subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    write_sample(&path, "v2");
    assert!(app.reload_configuration());
    write_sample(&path, "v3");
    assert!(app.reload_configuration());
    subscription.dispose();
    write_sample(&path, "v4");
    assert!(app.reload_configuration());

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// 测试配置文件损坏时保留原有配置
#[tokio::test]
async fn test_malformed_file_keeps_previous_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appsettings.json");
    write_sample(&path, "asd");
    let app = build_app(&path);
    let live = app.resolve::<LiveOptions<SampleSettings>>().unwrap();

    std::fs::write(&path, "{ \"Sample\": { \"Value1\": ").unwrap();
    assert!(!app.reload_configuration());
    assert_eq!(live.value().value1, "asd");
    assert_eq!(app.configuration().generation(), 1);
}

trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;
}

struct VectorRenderer;

impl Renderer for VectorRenderer {
    fn name(&self) -> &'static str {
        "vector"
    }
}

impl Injectable for VectorRenderer {
    fn inject(_resolver: &dyn ServiceResolver) -> Result<Self, DependencyError> {
        Ok(Self)
    }
}

fn renderer_types() -> Vec<TypeDescriptor> {
    vec![TypeDescriptor::service::<VectorRenderer>()
        .lifetime(Lifetime::Singleton)
        .contract::<dyn Renderer>(|renderer| renderer)
        .build()]
}

/// 测试重复扫描同一程序集得到相同的注册集合
#[tokio::test]
async fn test_repeated_assembly_scan_is_idempotent() {
    let assembly = StaticAssembly::new("renderers", renderer_types);
    let once = HearthApp::builder().scan_assembly(&assembly).build().unwrap();
    let twice = HearthApp::builder()
        .scan_assembly(&assembly)
        .scan_assembly(&assembly)
        .build()
        .unwrap();

    let mut once_keys = once.container().keys();
    let mut twice_keys = twice.container().keys();
    once_keys.sort_by_key(|key| key.type_name());
    twice_keys.sort_by_key(|key| key.type_name());
    assert_eq!(once_keys, twice_keys);
    assert_eq!(twice.resolve::<dyn Renderer>().unwrap().name(), "vector");
}

#[derive(Default)]
struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl UiHostNotifier for CollectingNotifier {
    async fn notify(&self, _title: &str, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// 测试实时选项变更经桥接送达宿主
#[tokio::test]
async fn test_live_change_reaches_host_notifier() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("appsettings.json");
    write_sample(&path, "asd");
    let app = build_app(&path);

    let host = Arc::new(CollectingNotifier::default());
    let bridge = NotificationBridge::spawn(host.clone());
    let sender = bridge.sender().expect("桥接应处于打开状态");
    let live = app.resolve::<LiveOptions<SampleSettings>>()?;
    let subscription = live.on_change(move |settings: &SampleSettings| {
        sender.send("配置更新", settings.value1.clone());
    });

    write_sample(&path, "zxc");
    assert!(app.reload_configuration());
    drop(subscription);

    assert_eq!(bridge.shutdown().await, 1);
    assert_eq!(*host.messages.lock().unwrap(), vec!["zxc".to_string()]);
    Ok(())
}

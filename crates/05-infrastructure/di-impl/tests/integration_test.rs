//! 依赖注入实现的集成测试

use hearth_common::{DependencyError, Lifetime};
use hearth_di::{
    ContainerBuilder, Dependency, Injectable, ServiceDescriptor, ServiceRegistry, ServiceResolver,
    StaticAssembly, TypeDescriptor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Once};
use std::thread;
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// 初始化测试日志系统（只初始化一次）
fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

/// 测试组件
struct PoliteGreeter {
    prefix: Arc<String>,
}

impl Greeter for PoliteGreeter {
    fn greet(&self, name: &str) -> String {
        format!("{}, {}", self.prefix, name)
    }
}

impl Injectable for PoliteGreeter {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::required::<String>()]
    }

    fn inject(resolver: &dyn ServiceResolver) -> Result<Self, DependencyError> {
        Ok(Self {
            prefix: resolver.resolve::<String>()?,
        })
    }
}

/// 可选依赖测试组件
struct Audit {
    greeter: Option<Arc<dyn Greeter>>,
}

impl Injectable for Audit {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::optional::<dyn Greeter>()]
    }

    fn inject(resolver: &dyn ServiceResolver) -> Result<Self, DependencyError> {
        Ok(Self {
            greeter: resolver.resolve_optional::<dyn Greeter>()?,
        })
    }
}

fn greeting_types() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::service::<PoliteGreeter>()
            .lifetime(Lifetime::Singleton)
            .contract::<dyn Greeter>(|greeter| greeter)
            .build(),
        TypeDescriptor::plain::<Audit>(),
    ]
}

/// 测试通过程序集扫描注册 trait 契约并解析
#[test]
fn test_scanned_contract_resolution() {
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceDescriptor::instance(Arc::new("Hello".to_string())));
    registry.scan_assembly(&StaticAssembly::new("greeting", greeting_types));
    let container = registry.build();

    let greeter = container.resolve::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet("Hearth"), "Hello, Hearth");

    let again = container.resolve::<dyn Greeter>().unwrap();
    assert!(Arc::ptr_eq(&greeter, &again));
    assert!(!container.is_registered::<Audit>());
}

/// 测试可选依赖未注册时解析为空
#[test]
fn test_optional_dependency() {
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceDescriptor::injectable::<Audit>(Lifetime::Transient));
    let container = registry.build();

    let audit = container.resolve::<Audit>().unwrap();
    assert!(audit.greeter.is_none());
}

/// 测试并发首次解析单例时工厂只执行一次
#[test]
fn test_concurrent_singleton_resolution() {
    init_test_logger();
    struct Slow(usize);

    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceDescriptor::singleton::<Slow, _>(move |_| {
        thread::sleep(Duration::from_millis(20));
        Ok(Arc::new(Slow(counter.fetch_add(1, Ordering::SeqCst))))
    }));
    let container = registry.build();

    let barrier = Barrier::new(8);
    let instances: Vec<Arc<Slow>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.resolve::<Slow>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
    assert_eq!(instances[0].0, 0);
}

struct Left;
struct Right;

/// 两个互相依赖但未声明依赖的服务，工厂先等待再解析对方
fn mutual_registry(lifetime: Lifetime) -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry
        .register(ServiceDescriptor::with_factory::<Left, _>(lifetime, |r| {
            thread::sleep(Duration::from_millis(100));
            r.resolve::<Right>()?;
            Ok(Arc::new(Left))
        }))
        .register(ServiceDescriptor::with_factory::<Right, _>(lifetime, |r| {
            thread::sleep(Duration::from_millis(100));
            r.resolve::<Left>()?;
            Ok(Arc::new(Right))
        }));
    registry
}

/// 在两个线程上同时首次解析，收集错误文本；超时视为死锁
fn resolve_pair_concurrently<F>(resolve: F) -> Vec<String>
where
    F: Fn(usize) -> Result<(), DependencyError> + Send + Sync + 'static,
{
    let resolve = Arc::new(resolve);
    let barrier = Arc::new(Barrier::new(2));
    let (tx, rx) = mpsc::channel();

    for index in 0..2 {
        let resolve = resolve.clone();
        let barrier = barrier.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            barrier.wait();
            let outcome = resolve(index);
            let _ = tx.send(outcome);
        });
    }
    drop(tx);

    let mut errors = Vec::new();
    for _ in 0..2 {
        let outcome = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("并发解析互相依赖的服务发生死锁");
        let err = outcome.expect_err("互相依赖的服务不应构造成功");
        assert!(err.is_configuration_error(), "unexpected error: {err}");
        errors.push(err.to_string());
    }
    errors
}

/// 测试未声明的单例循环在两个线程上同时解析时报告循环依赖而不是死锁
#[test]
fn test_concurrent_undeclared_singleton_cycle() {
    init_test_logger();
    let container = mutual_registry(Lifetime::Singleton).build();

    let errors = resolve_pair_concurrently(move |index| {
        if index == 0 {
            container.resolve::<Left>().map(drop)
        } else {
            container.resolve::<Right>().map(drop)
        }
    });

    assert!(errors
        .iter()
        .any(|e| e.contains("Left -> Right -> Left") || e.contains("Right -> Left -> Right")));
}

/// 测试同一作用域内未声明的循环在两个线程上同时解析时报告循环依赖
#[test]
fn test_concurrent_undeclared_scoped_cycle() {
    let scope = mutual_registry(Lifetime::Scoped).build().open_scope();

    let errors = resolve_pair_concurrently(move |index| {
        if index == 0 {
            scope.resolve::<Left>().map(drop)
        } else {
            scope.resolve::<Right>().map(drop)
        }
    });

    assert_eq!(errors.len(), 2);
}

/// 测试同一作用域内并发首次解析只构造一次
#[test]
fn test_concurrent_scoped_resolution() {
    struct Unit;

    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceDescriptor::scoped::<Unit, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Ok(Arc::new(Unit))
    }));
    let scope = registry.build().open_scope();

    let barrier = Barrier::new(6);
    let instances: Vec<Arc<Unit>> = thread::scope(|s| {
        let handles: Vec<_> = (0..6)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    scope.resolve::<Unit>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
}

/// 测试瞬时服务在作用域内每次都创建新实例
#[test]
fn test_transient_inside_scope() {
    struct Token;

    let mut registry = ServiceRegistry::new();
    registry.register(ServiceDescriptor::transient::<Token, _>(|_| Ok(Arc::new(Token))));
    let scope = registry.build().open_scope();

    let a = scope.resolve::<Token>().unwrap();
    let b = scope.resolve::<Token>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

/// 测试关闭循环检测后仍能在运行时发现循环
#[test]
fn test_runtime_cycle_detection_without_graph_check() {
    init_test_logger();
    #[derive(Debug)]
    struct Ouroboros;

    let mut registry = ServiceRegistry::new();
    registry.register(
        ServiceDescriptor::transient::<Ouroboros, _>(|r| {
            r.resolve::<Ouroboros>()?;
            Ok(Arc::new(Ouroboros))
        })
        .depends_on::<Ouroboros>(),
    );
    let container = ContainerBuilder::new(registry)
        .with_options(hearth_di::ContainerOptions {
            enable_circular_dependency_detection: false,
            ..Default::default()
        })
        .build();

    let err = container.resolve::<Ouroboros>().unwrap_err();
    match err {
        DependencyError::CircularDependency { dependency_chain } => {
            assert_eq!(dependency_chain, "Ouroboros -> Ouroboros");
        }
        other => panic!("unexpected error: {other}"),
    }
}

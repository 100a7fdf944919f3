//! 示例服务

use hearth_common::{DependencyError, Lifetime};
use hearth_di_abstractions::{
    Dependency, Injectable, ServiceResolver, StaticAssembly, TypeDescriptor,
};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// 问候服务
pub trait HelloService: Send + Sync {
    /// 返回问候语
    fn say_hello(&self) -> String;
}

/// Hearth 问候服务
pub trait HearthHelloService: Send + Sync {
    /// 返回问候语，包含基础问候服务的问候语
    fn say_hello(&self) -> Vec<String>;
}

/// 默认问候服务
#[derive(Debug, Default)]
pub struct WorldHelloService;

impl HelloService for WorldHelloService {
    fn say_hello(&self) -> String {
        info!("WorldHelloService: Hello, World!");
        "Hello, World!".to_string()
    }
}

impl Injectable for WorldHelloService {
    fn inject(_resolver: &dyn ServiceResolver) -> Result<Self, DependencyError> {
        Ok(Self)
    }
}

/// 依赖 [`HelloService`] 的问候服务
pub struct HearthGreeter {
    hello: Arc<dyn HelloService>,
}

impl HearthHelloService for HearthGreeter {
    fn say_hello(&self) -> Vec<String> {
        let mut greetings = vec![self.hello.say_hello()];
        info!("HearthGreeter: Hello, Hearth!");
        greetings.push("Hello, Hearth!".to_string());
        greetings
    }
}

impl Injectable for HearthGreeter {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::required::<dyn HelloService>()]
    }

    fn inject(resolver: &dyn ServiceResolver) -> Result<Self, DependencyError> {
        Ok(Self {
            hello: resolver.resolve::<dyn HelloService>()?,
        })
    }
}

/// 在每个级别写一条日志
#[derive(Debug, Default)]
pub struct TestLogService;

impl TestLogService {
    /// 写日志
    pub fn write_log(&self) {
        trace!("Configured type logger trace");
        debug!("Configured type logger debug");
        info!("Configured type logger info");
        warn!("Configured type logger warn");
        error!("Configured type logger error");
    }
}

impl Injectable for TestLogService {
    fn inject(_resolver: &dyn ServiceResolver) -> Result<Self, DependencyError> {
        Ok(Self)
    }
}

fn sample_types() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::service::<WorldHelloService>()
            .contract::<dyn HelloService>(|service| service)
            .build(),
        TypeDescriptor::service::<HearthGreeter>()
            .contract::<dyn HearthHelloService>(|service| service)
            .build(),
        TypeDescriptor::service::<TestLogService>()
            .lifetime(Lifetime::Singleton)
            .build(),
        TypeDescriptor::plain::<crate::settings::SampleSettings>(),
    ]
}

/// 示例程序集
pub fn sample_assembly() -> StaticAssembly {
    StaticAssembly::new("hearth-sample-app", sample_types)
}

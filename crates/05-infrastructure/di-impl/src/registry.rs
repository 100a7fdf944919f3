//! 服务注册表

use crate::container::{Container, ContainerBuilder};
use hearth_common::{Lifetime, ServiceKey};
use hearth_di_abstractions::{AssemblyProvider, ServiceDescriptor};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 服务注册表
///
/// 同一服务键重复注册时，后注册的覆盖先注册的。
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    registrations: HashMap<ServiceKey, ServiceDescriptor>,
    order: Vec<ServiceKey>,
    scanned_assemblies: HashSet<String>,
}

impl ServiceRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册服务
    pub fn register(&mut self, descriptor: impl Into<ServiceDescriptor>) -> &mut Self {
        let descriptor = descriptor.into();
        let key = descriptor.key();

        match self.registrations.get(&key) {
            Some(previous) if previous.lifetime() != descriptor.lifetime() => {
                warn!(
                    "服务 {} 被重新注册，生命周期从 {} 变为 {}",
                    key,
                    previous.lifetime(),
                    descriptor.lifetime()
                );
            }
            Some(_) => debug!("服务 {} 被重新注册", key),
            None => self.order.push(key),
        }

        debug!(
            "注册服务: {} -> {} ({})",
            key,
            descriptor.implementation_name(),
            descriptor.lifetime()
        );
        self.registrations.insert(key, descriptor);
        self
    }

    /// 扫描程序集并注册其中标记为服务的类型
    ///
    /// 同名程序集只扫描一次，返回本次新增的注册数量。
    pub fn scan_assembly(&mut self, assembly: &dyn AssemblyProvider) -> usize {
        if !self.scanned_assemblies.insert(assembly.name().to_string()) {
            debug!("程序集 {} 已扫描，跳过", assembly.name());
            return 0;
        }

        let mut count = 0;
        for descriptor in assembly.enumerate_types() {
            for registration in descriptor.registrations() {
                self.register(registration);
                count += 1;
            }
        }

        info!("扫描程序集 {}，注册了 {} 个服务", assembly.name(), count);
        count
    }

    /// 扫描程序集及其引用的全部程序集
    pub fn scan_assembly_and_referenced(&mut self, assembly: &dyn AssemblyProvider) -> usize {
        let mut count = self.scan_assembly(assembly);
        let mut pending: Vec<Arc<dyn AssemblyProvider>> = assembly.referenced();

        while let Some(next) = pending.pop() {
            if self.scanned_assemblies.contains(next.name()) {
                continue;
            }
            count += self.scan_assembly(next.as_ref());
            pending.extend(next.referenced());
        }

        count
    }

    /// 检查服务是否已注册
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.contains_key(ServiceKey::of::<T>())
    }

    /// 检查服务键是否已注册
    pub fn contains_key(&self, key: ServiceKey) -> bool {
        self.registrations.contains_key(&key)
    }

    /// 按注册顺序返回服务键
    pub fn keys(&self) -> &[ServiceKey] {
        &self.order
    }

    /// 注册数量
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// 查询服务的生命周期
    pub fn lifetime_of(&self, key: ServiceKey) -> Option<Lifetime> {
        self.registrations.get(&key).map(ServiceDescriptor::lifetime)
    }

    /// 查询注册描述
    pub fn descriptor(&self, key: ServiceKey) -> Option<&ServiceDescriptor> {
        self.registrations.get(&key)
    }

    /// 使用默认配置构建容器
    pub fn build(self) -> Container {
        ContainerBuilder::new(self).build()
    }

    pub(crate) fn into_descriptors(self) -> Vec<ServiceDescriptor> {
        let Self {
            mut registrations,
            order,
            ..
        } = self;
        order
            .into_iter()
            .filter_map(|key| registrations.remove(&key))
            .collect()
    }
}

//! 配置绑定器实现

use hearth_common::BindingError;
use hearth_config_abstractions::{BindOptions, BindOutcome, ConfigurationSnapshot};
use tracing::{debug, warn};

/// 配置绑定器
///
/// 按 [`BindOptions::schema`] 给出的字段表把配置节绑定到选项类型：
/// 配置中不存在的字段保留默认值，没有对应字段的配置键被忽略，
/// 无法转换的值使字段保留默认值并把结果标记为降级。
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigBinder;

impl ConfigBinder {
    /// 绑定配置节
    pub fn bind<T: BindOptions>(snapshot: &ConfigurationSnapshot, section: &str) -> BindOutcome<T> {
        let schema = T::schema();
        let view = snapshot.section(section);
        let mut value = T::default();
        let mut errors = Vec::new();

        for field in schema.fields() {
            let Some(raw) = view.get(field.name()) else {
                continue;
            };
            if raw.is_null() {
                continue;
            }

            if let Err(reason) = field.apply(&mut value, raw) {
                warn!(
                    "配置字段绑定失败，保留默认值: {}.{} = {} ({})",
                    section,
                    field.name(),
                    raw,
                    reason
                );
                errors.push(BindingError {
                    section: section.to_string(),
                    field: field.name().to_string(),
                    value: raw.to_string(),
                    reason,
                });
            }
        }

        for (key, _) in view.entries() {
            if schema.find(key).is_none() {
                debug!(
                    "忽略未映射的配置键: {}.{} -> {}",
                    section,
                    key,
                    std::any::type_name::<T>()
                );
            }
        }

        BindOutcome::new(value, errors, snapshot.generation())
    }
}

//! 选项绑定约定
//!
//! 每个选项类型通过 [`BindOptions::schema`] 提供字段绑定表，绑定器按表中的字段名
//! （不区分大小写）从配置节读取值并转换为字段类型。

use crate::snapshot::fold_key;
use hearth_common::{BindingError, ConfigError};
use serde_json::Value;
use std::fmt;

/// 配置值转换 trait
pub trait FromConfigValue: Sized {
    /// 从配置值转换，失败时返回原因
    fn from_config_value(value: &Value) -> Result<Self, String>;
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "布尔值",
        Value::Number(_) => "数值",
        Value::String(_) => "字符串",
        Value::Array(_) => "数组",
        Value::Object(_) => "对象",
    }
}

impl FromConfigValue for String {
    fn from_config_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            Value::Bool(flag) => Ok(flag.to_string()),
            other => Err(format!("期望字符串，实际为{}", kind_of(other))),
        }
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(flag) => Ok(*flag),
            Value::String(text) => text
                .trim()
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| format!("无法将 \"{text}\" 解析为布尔值")),
            other => Err(format!("期望布尔值，实际为{}", kind_of(other))),
        }
    }
}

macro_rules! impl_integer {
    ($($ty:ty),*) => {$(
        impl FromConfigValue for $ty {
            fn from_config_value(value: &Value) -> Result<Self, String> {
                match value {
                    Value::Number(number) => {
                        let converted = if let Some(signed) = number.as_i64() {
                            <$ty>::try_from(signed).ok()
                        } else if let Some(unsigned) = number.as_u64() {
                            <$ty>::try_from(unsigned).ok()
                        } else {
                            return Err(format!("{number} 不是整数"));
                        };
                        converted.ok_or_else(|| {
                            format!("{number} 超出 {} 的取值范围", stringify!($ty))
                        })
                    }
                    Value::String(text) => text.trim().parse::<$ty>().map_err(|err| {
                        format!("无法将 \"{text}\" 解析为 {}: {err}", stringify!($ty))
                    }),
                    other => Err(format!("期望整数，实际为{}", kind_of(other))),
                }
            }
        }
    )*};
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_float {
    ($($ty:ty),*) => {$(
        impl FromConfigValue for $ty {
            #[allow(clippy::cast_possible_truncation)]
            fn from_config_value(value: &Value) -> Result<Self, String> {
                match value {
                    Value::Number(number) => number
                        .as_f64()
                        .map(|float| float as $ty)
                        .ok_or_else(|| format!("{number} 不是有效数值")),
                    Value::String(text) => text.trim().parse::<$ty>().map_err(|err| {
                        format!("无法将 \"{text}\" 解析为 {}: {err}", stringify!($ty))
                    }),
                    other => Err(format!("期望数值，实际为{}", kind_of(other))),
                }
            }
        }
    )*};
}

impl_float!(f32, f64);

impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    fn from_config_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    T::from_config_value(item).map_err(|reason| format!("第 {index} 项: {reason}"))
                })
                .collect(),
            other => Err(format!("期望数组，实际为{}", kind_of(other))),
        }
    }
}

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    fn from_config_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_config_value(other).map(Some),
        }
    }
}

type FieldSetter<T> = Box<dyn Fn(&mut T, &Value) -> Result<(), String> + Send + Sync>;

/// 字段绑定
pub struct FieldBinding<T> {
    name: &'static str,
    setter: FieldSetter<T>,
}

impl<T> FieldBinding<T> {
    /// 字段名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 转换配置值并写入字段，转换失败时字段保持不变
    pub fn apply(&self, target: &mut T, value: &Value) -> Result<(), String> {
        (self.setter)(target, value)
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding").field("name", &self.name).finish()
    }
}

/// 选项类型的字段绑定表
#[derive(Debug)]
pub struct OptionsSchema<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T: 'static> OptionsSchema<T> {
    /// 创建空绑定表
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// 添加字段
    #[must_use]
    pub fn field<V>(mut self, name: &'static str, set: fn(&mut T, V)) -> Self
    where
        V: FromConfigValue + 'static,
    {
        self.fields.push(FieldBinding {
            name,
            setter: Box::new(move |target: &mut T, value: &Value| {
                let converted = V::from_config_value(value)?;
                set(target, converted);
                Ok(())
            }),
        });
        self
    }

    /// 所有字段
    pub fn fields(&self) -> &[FieldBinding<T>] {
        &self.fields
    }

    /// 按名称查找字段（不区分大小写）
    pub fn find(&self, name: &str) -> Option<&FieldBinding<T>> {
        let folded = fold_key(name);
        self.fields
            .iter()
            .find(|field| fold_key(&field.name) == folded)
    }
}

impl<T: 'static> Default for OptionsSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 可绑定的选项类型
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Default)]
/// struct SampleSettings {
///     value1: String,
///     value2: i32,
/// }
///
/// impl BindOptions for SampleSettings {
///     fn schema() -> OptionsSchema<Self> {
///         OptionsSchema::new()
///             .field("Value1", |s: &mut Self, v: String| s.value1 = v)
///             .field("Value2", |s: &mut Self, v: i32| s.value2 = v)
///     }
/// }
/// ```
pub trait BindOptions: Default + Send + Sync + 'static {
    /// 字段绑定表
    fn schema() -> OptionsSchema<Self>;
}

/// 绑定结果
#[derive(Debug, Clone)]
pub struct BindOutcome<T> {
    value: T,
    errors: Vec<BindingError>,
    generation: u64,
}

impl<T> BindOutcome<T> {
    /// 创建绑定结果
    pub fn new(value: T, errors: Vec<BindingError>, generation: u64) -> Self {
        Self {
            value,
            errors,
            generation,
        }
    }

    /// 绑定得到的值
    pub fn value(&self) -> &T {
        &self.value
    }

    /// 取出绑定得到的值
    pub fn into_value(self) -> T {
        self.value
    }

    /// 字段绑定错误
    pub fn errors(&self) -> &[BindingError] {
        &self.errors
    }

    /// 是否有字段因转换失败保留了默认值
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 绑定所用快照的代数
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 严格模式：存在字段绑定错误时返回第一个错误
    pub fn into_result(self) -> Result<T, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error.into()),
            None => Ok(self.value),
        }
    }
}

//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {path}, 原因: {source}")]
    ParseError {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("不支持的配置文件格式: {path}")]
    UnsupportedFormat { path: String },

    #[error("配置文件监控失败: {message}")]
    WatchError { message: String },

    #[error("{source}")]
    Binding {
        #[from]
        source: BindingError,
    },
}

impl ConfigError {
    /// 创建解析错误
    pub fn parse_error(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ParseError {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// 创建监控错误
    pub fn watch_error(message: impl Into<String>) -> Self {
        Self::WatchError {
            message: message.into(),
        }
    }
}

/// 配置绑定错误
///
/// 单个字段的值无法转换为目标类型。绑定过程会把该字段保留为默认值并继续，
/// 此错误只被记录在绑定结果中，不会中断整个配置节的绑定。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("配置绑定失败: {section}.{field}, 值: {value}, 原因: {reason}")]
pub struct BindingError {
    pub section: String,
    pub field: String,
    pub value: String,
    pub reason: String,
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("组件未注册: {type_name}{}", dependent_suffix(.required_by))]
    ComponentNotRegistered {
        type_name: String,
        required_by: Option<String>,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("作用域组件必须在作用域内解析: {type_name}")]
    ScopeRequired { type_name: String },

    #[error("作用域已释放: {scope_id}")]
    ScopeDisposed { scope_id: uuid::Uuid },

    #[error("组件类型不匹配: {type_name}")]
    TypeMismatch { type_name: String },
}

impl DependencyError {
    /// 创建组件未注册错误
    pub fn not_registered(type_name: impl Into<String>) -> Self {
        Self::ComponentNotRegistered {
            type_name: type_name.into(),
            required_by: None,
        }
    }

    /// 是否为注册图结构错误（循环依赖）
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

fn dependent_suffix(required_by: &Option<String>) -> String {
    required_by
        .as_ref()
        .map(|dependent| format!(" (被 {dependent} 依赖)"))
        .unwrap_or_default()
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

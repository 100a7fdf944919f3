//! 容器配置

/// 容器配置
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    /// 首次解析某个服务时，按声明的依赖图检查循环依赖
    pub enable_circular_dependency_detection: bool,
    /// 单例构造时是否允许依赖作用域服务
    ///
    /// 默认不允许：单例工厂在无作用域的上下文中运行，解析作用域服务会得到
    /// [`hearth_common::DependencyError::ScopeRequired`]。
    pub allow_scoped_in_singleton: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            allow_scoped_in_singleton: false,
        }
    }
}

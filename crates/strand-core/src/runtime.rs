use crate::observability::{Logger, MetricsProvider};
use alloc::sync::Arc;

/// 链路运行所需的宿主服务集合。
///
/// # 设计背景（Why）
/// - 日志与指标后端由宿主进程决定，核心 crate 通过依赖注入聚合这些能力，
///   避免在链路内部散落多个全局单例；
/// - 以 `Arc<dyn Trait>` 承载，克隆成本低，可随连接任意传递。
///
/// # 契约说明（What）
/// - **前置条件**：两个字段均不可为空实现以外的悬空引用，构造后即可用；
/// - **后置条件**：`Clone` 仅复制引用计数，所有链路共享同一后端。
#[derive(Clone)]
pub struct Services {
    /// 结构化日志出口。
    pub logger: Arc<dyn Logger>,
    /// 指标工厂。
    pub metrics: Arc<dyn MetricsProvider>,
}

impl Services {
    /// 组装服务集合。
    pub fn new(logger: Arc<dyn Logger>, metrics: Arc<dyn MetricsProvider>) -> Self {
        Self { logger, metrics }
    }
}

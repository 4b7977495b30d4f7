use crate::error::Error;
use alloc::boxed::Box;

/// 对象安全的结构化日志接口。
///
/// # 设计背景（Why）
/// - 核心 crate 兼容 `no_std`，不能绑定任何具体日志后端；宿主进程在组装
///   [`Services`](crate::runtime::Services) 时注入实现。
///
/// # 契约说明（What）
/// - 实现必须线程安全（`Send + Sync`），链路的多条连接会并发写日志；
/// - `error` 可附带错误链根节点，实现侧负责展开 `source()` 打印。
pub trait Logger: Send + Sync {
    /// 记录常规事件。
    fn info(&self, message: &str);
    /// 记录可恢复的异常迹象。
    fn warn(&self, message: &str);
    /// 记录错误事件，可选附带底层错误。
    fn error(&self, message: &str, cause: Option<&dyn Error>);
}

/// 单调递增计数器。
pub trait Counter: Send + Sync {
    /// 按标签累加。
    fn add(&self, value: u64, labels: &[(&'static str, &'static str)]);
}

/// 可任意设值的仪表。
pub trait Gauge: Send + Sync {
    /// 按标签覆盖当前值。
    fn set(&self, value: f64, labels: &[(&'static str, &'static str)]);
}

/// 指标工厂，按名称产出具体仪表。
///
/// # 契约说明（What）
/// - 同名指标多次获取应指向同一后端序列，聚合由实现负责；
/// - 指标名称使用 [`metrics`] 模块备案的常量，禁止动态拼接。
pub trait MetricsProvider: Send + Sync {
    /// 获取计数器。
    fn counter(&self, name: &'static str) -> Box<dyn Counter>;
    /// 获取仪表。
    fn gauge(&self, name: &'static str) -> Box<dyn Gauge>;
}

/// 链路引擎备案的指标名称与标签常量。
pub mod metrics {
    /// 链路结构变更总次数（add / remove）。
    pub const MUTATION_TOTAL: &str = "strand.pipeline.mutation.total";
    /// 链路当前纪元值。
    pub const EPOCH: &str = "strand.pipeline.epoch";
    /// 穿透异常链未被消费的故障总数。
    pub const UNHANDLED_FAULT_TOTAL: &str = "strand.pipeline.unhandled_fault.total";
    /// 抵达链尾被丢弃的入站读消息总数。
    pub const DISCARDED_READ_TOTAL: &str = "strand.pipeline.discarded_read.total";

    /// 变更操作类型标签键。
    pub const ATTR_OP: &str = "op";
    /// `op` 标签：新增 Handler。
    pub const OP_ADD: &str = "add";
    /// `op` 标签：移除 Handler。
    pub const OP_REMOVE: &str = "remove";
}

use crate::error::{PipelineError, Result};
use crate::pipeline::pipeline::Pipeline;
use crate::runtime::Services;
use crate::sealed::Sealed;
use crate::transport::Transport;
use alloc::sync::Arc;

/// 新建连接时组装链路的工厂。
///
/// # 设计背景（Why）
/// - 服务端每接受一条连接都需要一条结构相同的链路；工厂封装"创建链路 +
///   挂载初始 Handler"的过程，接入层只持有 `Arc<dyn PipelineFactory>`。
///
/// # 契约说明（What）
/// - 实现必须线程安全，多个接入线程可能并发建链；
/// - 任一初始 Handler 挂载失败时整体返回 `Err`，不得交付半成品链路。
pub trait PipelineFactory: Send + Sync + Sealed + 'static {
    /// 为一条新连接组装链路。
    fn build(
        &self,
        transport: Arc<dyn Transport>,
        services: Services,
    ) -> Result<Arc<Pipeline>, PipelineError>;
}

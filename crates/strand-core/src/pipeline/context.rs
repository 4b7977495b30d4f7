use crate::error::PipelineError;
use crate::message::{Message, UserEvent};
use crate::observability::Logger;
use crate::pipeline::pipeline::{InboundEvent, OutboundEvent, Pipeline, StageEntry, StageId};
use crate::sealed::Sealed;
use crate::transport::{Completion, TransportAddr};
use alloc::sync::Arc;
use alloc::vec::Vec;

/// Handler 观察与驱动链路的窗口。
///
/// # 设计背景（Why）
/// - Handler 不应直接感知链路的内部结构；上下文以当前位置为锚点，提供
///   "向后继续入站"与"向前继续出站"两组转发原语，默认转发实现与业务覆写
///   共用同一套入口。
///
/// # 契约说明（What）
/// - `fire_*` 系列从当前位置的**下一个**入站槽位继续传播；
/// - 出站系列从当前位置的**上一个**出站槽位继续传播，越过头部后交付传输层；
/// - 上下文绑定派发发生时的链路快照，结构变更不影响进行中的传播。
pub trait Context: Send + Sync + Sealed {
    /// 当前阶段的稳定标识。
    fn stage_id(&self) -> StageId;
    /// 当前阶段的注册名称。
    fn name(&self) -> &str;
    /// 所属链路。
    fn pipeline(&self) -> &Arc<Pipeline>;
    /// 宿主注入的日志出口。
    fn logger(&self) -> &dyn Logger;

    /// 向后续入站槽位传播"连接已注册"。
    fn fire_channel_registered(&self);
    /// 向后续入站槽位传播"连接已活跃"。
    fn fire_channel_active(&self);
    /// 向后续入站槽位传播"连接已去活"。
    fn fire_channel_inactive(&self);
    /// 向后续入站槽位传播一条消息。
    fn fire_channel_read(&self, message: Message);
    /// 向后续入站槽位传播"本轮读取结束"。
    fn fire_channel_read_complete(&self);
    /// 向后续入站槽位传播自定义事件。
    fn fire_user_event(&self, event: UserEvent);
    /// 向后续入站槽位传播可写性变化。
    fn fire_writability_changed(&self, writable: bool);
    /// 向后续异常槽位传播故障。
    fn fire_exception_caught(&self, cause: PipelineError);

    /// 向前序出站槽位传播绑定请求。
    fn bind(&self, addr: TransportAddr, completion: Completion);
    /// 向前序出站槽位传播连接请求。
    fn connect(&self, remote: TransportAddr, local: Option<TransportAddr>, completion: Completion);
    /// 向前序出站槽位传播断开请求。
    fn disconnect(&self, completion: Completion);
    /// 向前序出站槽位传播关闭请求。
    fn close(&self, completion: Completion);
    /// 向前序出站槽位传播读取请求。
    fn read(&self);
    /// 向前序出站槽位传播写出请求。
    fn write(&self, message: Message, completion: Completion);
    /// 向前序出站槽位传播冲刷请求。
    fn flush(&self);
}

/// [`Context`] 的链内实现，绑定一份链路快照与其中的一个位置。
pub(crate) struct StageContext {
    pipeline: Arc<Pipeline>,
    snapshot: Arc<Vec<Arc<StageEntry>>>,
    index: usize,
}

impl StageContext {
    pub(crate) fn new(
        pipeline: Arc<Pipeline>,
        snapshot: Arc<Vec<Arc<StageEntry>>>,
        index: usize,
    ) -> Self {
        Self {
            pipeline,
            snapshot,
            index,
        }
    }

    fn entry(&self) -> &StageEntry {
        &self.snapshot[self.index]
    }
}

impl Context for StageContext {
    fn stage_id(&self) -> StageId {
        self.entry().id()
    }

    fn name(&self) -> &str {
        self.entry().name()
    }

    fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    fn logger(&self) -> &dyn Logger {
        self.pipeline.logger()
    }

    fn fire_channel_registered(&self) {
        self.pipeline
            .dispatch_inbound_from(&self.snapshot, self.index + 1, InboundEvent::Registered);
    }

    fn fire_channel_active(&self) {
        self.pipeline
            .dispatch_inbound_from(&self.snapshot, self.index + 1, InboundEvent::Active);
    }

    fn fire_channel_inactive(&self) {
        self.pipeline
            .dispatch_inbound_from(&self.snapshot, self.index + 1, InboundEvent::Inactive);
    }

    fn fire_channel_read(&self, message: Message) {
        self.pipeline.dispatch_inbound_from(
            &self.snapshot,
            self.index + 1,
            InboundEvent::Read(message),
        );
    }

    fn fire_channel_read_complete(&self) {
        self.pipeline
            .dispatch_inbound_from(&self.snapshot, self.index + 1, InboundEvent::ReadComplete);
    }

    fn fire_user_event(&self, event: UserEvent) {
        self.pipeline.dispatch_inbound_from(
            &self.snapshot,
            self.index + 1,
            InboundEvent::UserEvent(event),
        );
    }

    fn fire_writability_changed(&self, writable: bool) {
        self.pipeline.dispatch_inbound_from(
            &self.snapshot,
            self.index + 1,
            InboundEvent::WritabilityChanged(writable),
        );
    }

    fn fire_exception_caught(&self, cause: PipelineError) {
        self.pipeline
            .dispatch_exception_from(&self.snapshot, self.index + 1, cause);
    }

    fn bind(&self, addr: TransportAddr, completion: Completion) {
        self.pipeline.dispatch_outbound_from(
            &self.snapshot,
            self.index,
            OutboundEvent::Bind { addr, completion },
        );
    }

    fn connect(&self, remote: TransportAddr, local: Option<TransportAddr>, completion: Completion) {
        self.pipeline.dispatch_outbound_from(
            &self.snapshot,
            self.index,
            OutboundEvent::Connect {
                remote,
                local,
                completion,
            },
        );
    }

    fn disconnect(&self, completion: Completion) {
        self.pipeline.dispatch_outbound_from(
            &self.snapshot,
            self.index,
            OutboundEvent::Disconnect { completion },
        );
    }

    fn close(&self, completion: Completion) {
        self.pipeline.dispatch_outbound_from(
            &self.snapshot,
            self.index,
            OutboundEvent::Close { completion },
        );
    }

    fn read(&self) {
        self.pipeline
            .dispatch_outbound_from(&self.snapshot, self.index, OutboundEvent::Read);
    }

    fn write(&self, message: Message, completion: Completion) {
        self.pipeline.dispatch_outbound_from(
            &self.snapshot,
            self.index,
            OutboundEvent::Write {
                message,
                completion,
            },
        );
    }

    fn flush(&self) {
        self.pipeline
            .dispatch_outbound_from(&self.snapshot, self.index, OutboundEvent::Flush);
    }
}

use crate::error::{PipelineError, Result};
use crate::message::{Message, UserEvent};
use crate::pipeline::context::Context;
use crate::sealed::Sealed;
use crate::transport::{Completion, TransportAddr};
use core::sync::atomic::{AtomicBool, Ordering};

/// Handler 实例的附着凭证。
///
/// # 设计背景（Why）
/// - 非共享 Handler 同一时刻只允许附着到一条链路；凭证内嵌在 Handler 实例
///   中，使附着状态与实例生命周期天然绑定。
///
/// # 逻辑解析（How）
/// - 单个 `AtomicBool` 上的 CAS（false → true）即为抢占附着权；
/// - 移除流程完成后调用 [`detach`](Self::detach) 归还凭证，实例可再次附着。
///
/// # 契约说明（What）
/// - 共享 Handler（`is_sharable() == true`）跳过凭证检查，凭证保持空闲。
#[derive(Debug)]
pub struct AttachmentCell(AtomicBool);

impl AttachmentCell {
    /// 创建空闲凭证。
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// 尝试抢占附着权；已被占用时返回 `false`。
    pub fn try_attach(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 归还附着权。
    pub fn detach(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// 当前是否处于附着状态。
    pub fn is_attached(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for AttachmentCell {
    fn default() -> Self {
        Self::new()
    }
}

/// 链路中的处理单元。
///
/// # 设计背景（Why）
/// - 入站（传输层 → 应用）与出站（应用 → 传输层）事件共用同一个 Trait，
///   每个槽位都带默认转发实现：只覆写关心的槽位，未覆写的事件原样沿链传递；
/// - 故障以返回值表达（`Err`），由链路统一路由到异常链，而非在回调内恐慌。
///
/// # 逻辑解析（How）
/// - 入站槽位默认调用 `ctx.fire_*` 转发给下一个入站 Handler；
/// - 出站槽位默认调用 `ctx.bind` / `ctx.write` 等转发给上一个出站 Handler；
/// - [`attachment`](Self::attachment) 暴露实例内嵌的 [`AttachmentCell`]，
///   链路在挂载时据此实施"非共享实例单链附着"约束。
///
/// # 契约说明（What）
/// - **前置条件**：实现必须 `Send + Sync + 'static`，同一连接上的回调串行
///   执行，但不同连接可能并发触发共享实例；
/// - **后置条件**：槽位返回 `Err` 时本次事件的后续传递由异常链接管，实现
///   不应自行重复转发。
#[allow(unused_variables)]
pub trait Handler: Send + Sync + Sealed + 'static {
    /// 返回实例的附着凭证。
    fn attachment(&self) -> &AttachmentCell;

    /// 实例是否可以同时附着到多条链路。
    ///
    /// 返回 `true` 的实现必须是无状态的，或对内部状态做并发防护。
    fn is_sharable(&self) -> bool {
        false
    }

    /// 挂载完成后回调；返回 `Err` 会使本次挂载整体失败并回滚。
    fn handler_added(&self, ctx: &dyn Context) -> Result<()> {
        Ok(())
    }

    /// 摘除完成前回调；返回 `Err` 只记录日志，不阻塞摘除。
    fn handler_removed(&self, ctx: &dyn Context) -> Result<()> {
        Ok(())
    }

    /// 连接注册到执行者。
    fn channel_registered(&self, ctx: &dyn Context) -> Result<()> {
        ctx.fire_channel_registered();
        Ok(())
    }

    /// 连接进入活跃状态。
    fn channel_active(&self, ctx: &dyn Context) -> Result<()> {
        ctx.fire_channel_active();
        Ok(())
    }

    /// 连接离开活跃状态。
    fn channel_inactive(&self, ctx: &dyn Context) -> Result<()> {
        ctx.fire_channel_inactive();
        Ok(())
    }

    /// 收到一条入站消息。
    fn channel_read(&self, ctx: &dyn Context, message: Message) -> Result<()> {
        ctx.fire_channel_read(message);
        Ok(())
    }

    /// 本轮入站读取结束。
    fn channel_read_complete(&self, ctx: &dyn Context) -> Result<()> {
        ctx.fire_channel_read_complete();
        Ok(())
    }

    /// 收到自定义用户事件。
    fn user_event(&self, ctx: &dyn Context, event: UserEvent) -> Result<()> {
        ctx.fire_user_event(event);
        Ok(())
    }

    /// 连接可写性发生变化。
    fn writability_changed(&self, ctx: &dyn Context, writable: bool) -> Result<()> {
        ctx.fire_writability_changed(writable);
        Ok(())
    }

    /// 收到沿异常链传播的故障。
    fn exception_caught(&self, ctx: &dyn Context, cause: PipelineError) -> Result<()> {
        ctx.fire_exception_caught(cause);
        Ok(())
    }

    /// 出站：绑定本地地址。
    fn bind(&self, ctx: &dyn Context, addr: TransportAddr, completion: Completion) -> Result<()> {
        ctx.bind(addr, completion);
        Ok(())
    }

    /// 出站：连接远端。
    fn connect(
        &self,
        ctx: &dyn Context,
        remote: TransportAddr,
        local: Option<TransportAddr>,
        completion: Completion,
    ) -> Result<()> {
        ctx.connect(remote, local, completion);
        Ok(())
    }

    /// 出站：断开连接。
    fn disconnect(&self, ctx: &dyn Context, completion: Completion) -> Result<()> {
        ctx.disconnect(completion);
        Ok(())
    }

    /// 出站：关闭连接。
    fn close(&self, ctx: &dyn Context, completion: Completion) -> Result<()> {
        ctx.close(completion);
        Ok(())
    }

    /// 出站：请求继续读取。
    fn read(&self, ctx: &dyn Context) -> Result<()> {
        ctx.read();
        Ok(())
    }

    /// 出站：写出一条消息。
    fn write(&self, ctx: &dyn Context, message: Message, completion: Completion) -> Result<()> {
        ctx.write(message, completion);
        Ok(())
    }

    /// 出站：冲刷挂起数据。
    fn flush(&self, ctx: &dyn Context) -> Result<()> {
        ctx.flush();
        Ok(())
    }
}

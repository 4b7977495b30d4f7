//! 测试专用 Handler 与事件记录工具。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use strand_core::error::PipelineError;
use strand_core::prelude::*;

/// 跨 Handler 共享的事件流水账。
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn record(log: &EventLog, entry: impl Into<String>) {
    log.lock().expect("事件流水账锁不应中毒").push(entry.into());
}

pub fn drain(log: &EventLog) -> Vec<String> {
    std::mem::take(&mut *log.lock().expect("事件流水账锁不应中毒"))
}

/// 记录经过的事件并继续转发的透传 Handler。
pub struct Forwarder {
    tag: &'static str,
    log: EventLog,
    attachment: AttachmentCell,
}

impl Forwarder {
    pub fn new(tag: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            tag,
            log: Arc::clone(log),
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for Forwarder {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn channel_read(&self, ctx: &dyn Context, message: Message) -> Result<()> {
        record(&self.log, format!("{}:read", self.tag));
        ctx.fire_channel_read(message);
        Ok(())
    }

    fn write(&self, ctx: &dyn Context, message: Message, completion: Completion) -> Result<()> {
        record(&self.log, format!("{}:write", self.tag));
        ctx.write(message, completion);
        Ok(())
    }

    fn exception_caught(&self, ctx: &dyn Context, cause: PipelineError) -> Result<()> {
        record(&self.log, format!("{}:exception", self.tag));
        ctx.fire_exception_caught(cause);
        Ok(())
    }
}

/// 记录入站消息并就地终止传播的消费者。
pub struct Consumer {
    tag: &'static str,
    log: EventLog,
    attachment: AttachmentCell,
}

impl Consumer {
    pub fn new(tag: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            tag,
            log: Arc::clone(log),
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for Consumer {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn channel_read(&self, _ctx: &dyn Context, _message: Message) -> Result<()> {
        record(&self.log, format!("{}:read", self.tag));
        Ok(())
    }
}

/// 每次收到入站消息都产生故障的 Handler。
pub struct Faulty {
    attachment: AttachmentCell,
}

impl Faulty {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for Faulty {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn channel_read(&self, _ctx: &dyn Context, _message: Message) -> Result<()> {
        Err(PipelineError::new("app.test_fault", "injected read fault"))
    }
}

/// 记录并消费异常链故障的 Handler。
pub struct Catcher {
    tag: &'static str,
    log: EventLog,
    attachment: AttachmentCell,
}

impl Catcher {
    pub fn new(tag: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            tag,
            log: Arc::clone(log),
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for Catcher {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn exception_caught(&self, _ctx: &dyn Context, cause: PipelineError) -> Result<()> {
        record(&self.log, format!("{}:caught:{}", self.tag, cause.code()));
        Ok(())
    }
}

/// 对 `u64` 消息加一后继续转发。
pub struct AddOne {
    attachment: AttachmentCell,
}

impl AddOne {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for AddOne {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn channel_read(&self, ctx: &dyn Context, message: Message) -> Result<()> {
        match message.try_into_user::<u64>() {
            Ok(value) => ctx.fire_channel_read(Message::from_user(value + 1)),
            Err(other) => ctx.fire_channel_read(other),
        }
        Ok(())
    }
}

/// 对 `u64` 消息翻倍后继续转发。
pub struct Double {
    attachment: AttachmentCell,
}

impl Double {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for Double {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn channel_read(&self, ctx: &dyn Context, message: Message) -> Result<()> {
        match message.try_into_user::<u64>() {
            Ok(value) => ctx.fire_channel_read(Message::from_user(value * 2)),
            Err(other) => ctx.fire_channel_read(other),
        }
        Ok(())
    }
}

/// 收集最终 `u64` 结果并终止传播。
pub struct SinkU64 {
    out: Arc<Mutex<Vec<u64>>>,
    attachment: AttachmentCell,
}

impl SinkU64 {
    pub fn new(out: &Arc<Mutex<Vec<u64>>>) -> Arc<Self> {
        Arc::new(Self {
            out: Arc::clone(out),
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for SinkU64 {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn channel_read(&self, _ctx: &dyn Context, message: Message) -> Result<()> {
        if let Ok(value) = message.try_into_user::<u64>() {
            self.out.lock().expect("结果锁不应中毒").push(value);
        }
        Ok(())
    }
}

/// 跨链路共享的计数 Handler。
pub struct SharedCounter {
    count: AtomicU64,
    attachment: AttachmentCell,
}

impl SharedCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            count: AtomicU64::new(0),
            attachment: AttachmentCell::new(),
        })
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}

impl Handler for SharedCounter {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn is_sharable(&self) -> bool {
        true
    }

    fn channel_read(&self, _ctx: &dyn Context, _message: Message) -> Result<()> {
        self.count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// 记录挂载/摘除回调的探针。
pub struct LifecycleProbe {
    log: EventLog,
    attachment: AttachmentCell,
}

impl LifecycleProbe {
    pub fn new(log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            log: Arc::clone(log),
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for LifecycleProbe {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn handler_added(&self, ctx: &dyn Context) -> Result<()> {
        record(&self.log, format!("added:{}", ctx.name()));
        Ok(())
    }

    fn handler_removed(&self, ctx: &dyn Context) -> Result<()> {
        record(&self.log, format!("removed:{}", ctx.name()));
        Ok(())
    }
}

/// 在首条入站消息中把自己摘除的 Handler。
pub struct SelfRemover {
    log: EventLog,
    attachment: AttachmentCell,
}

impl SelfRemover {
    pub fn new(log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            log: Arc::clone(log),
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for SelfRemover {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn handler_removed(&self, _ctx: &dyn Context) -> Result<()> {
        record(&self.log, "self:removed");
        Ok(())
    }

    fn channel_read(&self, ctx: &dyn Context, message: Message) -> Result<()> {
        record(&self.log, "self:read");
        ctx.pipeline()
            .remove_stage(ctx.stage_id())
            .expect("自摘除必须成功");
        ctx.fire_channel_read(message);
        Ok(())
    }
}

/// 挂载回调必然失败的 Handler。
pub struct FailingAdded {
    attachment: AttachmentCell,
}

impl FailingAdded {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for FailingAdded {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn handler_added(&self, _ctx: &dyn Context) -> Result<()> {
        Err(PipelineError::new("app.init_fault", "refusing to attach"))
    }
}

use crate::error::{PipelineError, Result};
use crate::message::{Message, UserEvent};
use crate::observability::{metrics, Logger};
use crate::pipeline::context::StageContext;
use crate::pipeline::handler::Handler;
use crate::pipeline::internal::ChainEpochBuffer;
use crate::runtime::Services;
use crate::transport::{Completion, Transport, TransportAddr};
use alloc::format;
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// 链路阶段的稳定标识。
///
/// # 契约说明（What）
/// - 标识在单条链路内全局唯一且不复用；
/// - [`HEAD`](Self::HEAD) 与 [`TAIL`](Self::TAIL) 是两端哨兵的保留标识，仅
///   作为 `add_before` / `add_after` 的锚点使用，不对应真实 Handler。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StageId(u64);

impl StageId {
    /// 头部哨兵（传输层一侧）。
    pub const HEAD: StageId = StageId(0);
    /// 尾部哨兵（应用一侧）。
    pub const TAIL: StageId = StageId(1);

    pub(crate) fn new(sequence: u64) -> Self {
        StageId(sequence)
    }

    /// 是否为哨兵标识。
    pub fn is_sentinel(&self) -> bool {
        matches!(*self, StageId::HEAD | StageId::TAIL)
    }

    /// 原始数值，仅用于日志与诊断。
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// 阶段生命周期状态机。
///
/// 合法迁移：`Created → Attaching → Attached → Detaching → Detached`；
/// 挂载失败回滚时 `Attaching → Created`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageState {
    /// 刚分配，尚未进入任何链路。
    Created,
    /// `handler_added` 执行中。
    Attaching,
    /// 正常在链，接收事件。
    Attached,
    /// 已从当前快照摘除，等待在途调用结束。
    Detaching,
    /// `handler_removed` 已触发，阶段终结。
    Detached,
}

impl StageState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => StageState::Created,
            1 => StageState::Attaching,
            2 => StageState::Attached,
            3 => StageState::Detaching,
            _ => StageState::Detached,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            StageState::Created => 0,
            StageState::Attaching => 1,
            StageState::Attached => 2,
            StageState::Detaching => 3,
            StageState::Detached => 4,
        }
    }
}

/// 链路中一个已注册阶段的完整记录。
pub(crate) struct StageEntry {
    id: StageId,
    name: String,
    handler: Arc<dyn Handler>,
    state: AtomicU8,
    in_flight: AtomicUsize,
    removed_fired: AtomicBool,
}

impl StageEntry {
    fn new(id: StageId, name: String, handler: Arc<dyn Handler>) -> Self {
        Self {
            id,
            name,
            handler,
            state: AtomicU8::new(StageState::Created.as_u8()),
            in_flight: AtomicUsize::new(0),
            removed_fired: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> StageId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    fn state(&self) -> StageState {
        StageState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, next: StageState) {
        self.state.store(next.as_u8(), Ordering::Release);
    }

    /// 仍可接收事件的状态集合。`Detaching` 保留在内：旧快照上的在途传播
    /// 允许继续抵达该阶段，直到 `handler_removed` 触发。
    fn is_live(&self) -> bool {
        matches!(
            self.state(),
            StageState::Attaching | StageState::Attached | StageState::Detaching
        )
    }

    fn enter(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// 对外暴露的阶段登记信息。
#[derive(Clone, Debug)]
pub struct StageRegistration {
    /// 阶段标识。
    pub id: StageId,
    /// 注册名称。
    pub name: String,
    /// 当前生命周期状态。
    pub state: StageState,
}

/// 入站事件的内部表示，沿链从头部向尾部传播。
pub(crate) enum InboundEvent {
    Registered,
    Active,
    Inactive,
    Read(Message),
    ReadComplete,
    UserEvent(UserEvent),
    WritabilityChanged(bool),
}

/// 出站事件的内部表示，沿链从尾部向头部传播。
pub(crate) enum OutboundEvent {
    Bind {
        addr: TransportAddr,
        completion: Completion,
    },
    Connect {
        remote: TransportAddr,
        local: Option<TransportAddr>,
        completion: Completion,
    },
    Disconnect {
        completion: Completion,
    },
    Close {
        completion: Completion,
    },
    Read,
    Write {
        message: Message,
        completion: Completion,
    },
    Flush,
}

impl OutboundEvent {
    /// 取出事件携带的完成凭证副本（若存在）。派发失败时用于落定失败结果。
    fn completion_handle(&self) -> Option<Completion> {
        match self {
            OutboundEvent::Bind { completion, .. }
            | OutboundEvent::Connect { completion, .. }
            | OutboundEvent::Disconnect { completion }
            | OutboundEvent::Close { completion }
            | OutboundEvent::Write { completion, .. } => Some(completion.clone()),
            OutboundEvent::Read | OutboundEvent::Flush => None,
        }
    }
}

enum InsertPosition {
    First,
    Last,
    Before(StageId),
    After(StageId),
}

/// 双向 Handler 链路，单条连接的事件主干道。
///
/// # 设计背景（Why）
/// - 入站事件自传输层进入，沿链从头部向尾部流经各阶段；出站操作自应用
///   发起，反向流回头部后交付 [`Transport`]；
/// - 结构变更（挂载/摘除）与事件派发解耦：变更方持互斥锁做"复制-替换"，
///   派发方始终读取不可变快照，互不阻塞。
///
/// # 逻辑解析（How）
/// - [`ChainEpochBuffer`] 保存 `Arc<Vec<Arc<StageEntry>>>` 快照与单调纪元；
/// - 每次成功变更发布新快照、递增纪元并上报指标与日志；
/// - 阶段自持在途计数：摘除只把阶段标记为 `Detaching`，等最后一次在途调用
///   退出后才触发 `handler_removed` 并终结为 `Detached`。
///
/// # 契约说明（What）
/// - **并发模型**：同一连接的事件派发由单一执行者串行驱动；结构变更可来自
///   任意线程，由内部互斥锁串行化；
/// - **故障即数据**：槽位回调返回 `Err` 不会恐慌，而是从故障阶段开始沿
///   异常链传播；穿透链尾的故障经
///   [`Transport::on_unhandled_fault`] 上报，且恰好一次。
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    services: Services,
    chain: ChainEpochBuffer,
    sequence: AtomicU64,
    mutation: spin::Mutex<()>,
    self_ref: spin::RwLock<Weak<Pipeline>>,
}

impl Pipeline {
    /// 创建空链路并绑定传输层与宿主服务。
    pub fn new(transport: Arc<dyn Transport>, services: Services) -> Arc<Self> {
        let pipeline = Arc::new(Self {
            transport,
            services,
            chain: ChainEpochBuffer::new(Arc::new(Vec::new())),
            // 0 与 1 为哨兵保留。
            sequence: AtomicU64::new(2),
            mutation: spin::Mutex::new(()),
            self_ref: spin::RwLock::new(Weak::new()),
        });
        *pipeline.self_ref.write() = Arc::downgrade(&pipeline);
        pipeline
    }

    fn upgrade_self(&self) -> Arc<Pipeline> {
        // self_ref 在 new() 返回前写入；只要 self 可达，升级必然成功。
        self.self_ref
            .read()
            .upgrade()
            .expect("链路自引用在构造完成后必然可升级")
    }

    pub(crate) fn logger(&self) -> &dyn Logger {
        self.services.logger.as_ref()
    }

    /// 当前结构纪元。每次成功的挂载或摘除使其加一。
    pub fn epoch(&self) -> u64 {
        self.chain.epoch()
    }

    // ---- 结构变更 ----

    /// 在链路头部之后挂载 Handler。
    pub fn add_first(&self, name: &str, handler: Arc<dyn Handler>) -> Result<StageId> {
        self.insert(InsertPosition::First, name, handler)
    }

    /// 在链路尾部之前挂载 Handler。
    pub fn add_last(&self, name: &str, handler: Arc<dyn Handler>) -> Result<StageId> {
        self.insert(InsertPosition::Last, name, handler)
    }

    /// 在指定锚点之前挂载 Handler。
    pub fn add_before(&self, anchor: StageId, name: &str, handler: Arc<dyn Handler>) -> Result<StageId> {
        self.insert(InsertPosition::Before(anchor), name, handler)
    }

    /// 在指定锚点之后挂载 Handler。
    pub fn add_after(&self, anchor: StageId, name: &str, handler: Arc<dyn Handler>) -> Result<StageId> {
        self.insert(InsertPosition::After(anchor), name, handler)
    }

    fn insert(&self, position: InsertPosition, name: &str, handler: Arc<dyn Handler>) -> Result<StageId> {
        let _guard = self.mutation.lock();
        let current = self.chain.load();

        if current.iter().any(|entry| entry.name() == name) {
            return Err(PipelineError::duplicate_name(name));
        }

        let index = self.resolve_index(&current, position)?;

        let attached_here = if handler.is_sharable() {
            false
        } else if handler.attachment().try_attach() {
            true
        } else {
            return Err(PipelineError::duplicate_attachment(name));
        };

        let id = StageId::new(self.sequence.fetch_add(1, Ordering::AcqRel));
        let entry = Arc::new(StageEntry::new(id, String::from(name), Arc::clone(&handler)));
        entry.set_state(StageState::Attaching);

        let mut next: Vec<Arc<StageEntry>> = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.insert(index, Arc::clone(&entry));
        let candidate = Arc::new(next);

        // 先在候选快照上跑 handler_added，失败时当前快照原封不动。
        let ctx = StageContext::new(self.upgrade_self(), Arc::clone(&candidate), index);
        if let Err(cause) = handler.handler_added(&ctx) {
            entry.set_state(StageState::Created);
            if attached_here {
                handler.attachment().detach();
            }
            return Err(PipelineError::stage_fault(name, cause));
        }

        entry.set_state(StageState::Attached);
        self.chain.store(candidate);
        self.record_mutation(metrics::OP_ADD, name);
        Ok(id)
    }

    fn resolve_index(&self, chain: &[Arc<StageEntry>], position: InsertPosition) -> Result<usize> {
        match position {
            InsertPosition::First => Ok(0),
            InsertPosition::Last => Ok(chain.len()),
            InsertPosition::Before(anchor) => match anchor {
                StageId::TAIL => Ok(chain.len()),
                StageId::HEAD => Err(PipelineError::handler_not_found("before head sentinel")),
                other => chain
                    .iter()
                    .position(|entry| entry.id() == other)
                    .ok_or_else(|| {
                        PipelineError::handler_not_found(&format!("stage #{}", other.raw()))
                    }),
            },
            InsertPosition::After(anchor) => match anchor {
                StageId::HEAD => Ok(0),
                StageId::TAIL => Err(PipelineError::handler_not_found("after tail sentinel")),
                other => chain
                    .iter()
                    .position(|entry| entry.id() == other)
                    .map(|index| index + 1)
                    .ok_or_else(|| {
                        PipelineError::handler_not_found(&format!("stage #{}", other.raw()))
                    }),
            },
        }
    }

    /// 按名称摘除 Handler。
    pub fn remove(&self, name: &str) -> Result<StageId> {
        self.detach_where(|entry| entry.name() == name, name)
    }

    /// 按阶段标识摘除 Handler。
    pub fn remove_stage(&self, id: StageId) -> Result<()> {
        self.detach_where(|entry| entry.id() == id, &format!("stage #{}", id.raw()))
            .map(|_| ())
    }

    /// 按实例摘除 Handler（指针相等）。
    pub fn remove_handler(&self, handler: &Arc<dyn Handler>) -> Result<StageId> {
        self.detach_where(
            |entry| Arc::ptr_eq(entry.handler(), handler),
            "handler instance",
        )
    }

    fn detach_where(
        &self,
        predicate: impl Fn(&Arc<StageEntry>) -> bool,
        what: &str,
    ) -> Result<StageId> {
        let (entry, old_snapshot, old_index) = {
            let _guard = self.mutation.lock();
            let current = self.chain.load();
            let index = current
                .iter()
                .position(|entry| predicate(entry))
                .ok_or_else(|| PipelineError::handler_not_found(what))?;
            let entry = Arc::clone(&current[index]);
            entry.set_state(StageState::Detaching);

            let mut next: Vec<Arc<StageEntry>> = Vec::with_capacity(current.len() - 1);
            next.extend(
                current
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, e)| Arc::clone(e)),
            );
            self.chain.store(Arc::new(next));
            self.record_mutation(metrics::OP_REMOVE, entry.name());
            (entry, current, index)
        };

        // 无在途调用时立刻终结；否则由最后一次在途调用退出时终结。
        self.finish_detach(&entry, &old_snapshot, old_index);
        Ok(entry.id())
    }

    /// 在途计数归零后触发 `handler_removed` 并把阶段终结为 `Detached`。
    /// `removed_fired` 的 CAS 保证该回调至多触发一次。
    fn finish_detach(
        &self,
        entry: &Arc<StageEntry>,
        snapshot: &Arc<Vec<Arc<StageEntry>>>,
        index: usize,
    ) {
        if entry.in_flight() != 0 {
            return;
        }
        if entry
            .removed_fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let ctx = StageContext::new(self.upgrade_self(), Arc::clone(snapshot), index);
        if let Err(cause) = entry.handler().handler_removed(&ctx) {
            self.logger().warn(&format!(
                "handler_removed of `{}` raised, detaching anyway: {}",
                entry.name(),
                cause,
            ));
        }
        entry.set_state(StageState::Detached);
        if !entry.handler().is_sharable() {
            entry.handler().attachment().detach();
        }
    }

    fn record_mutation(&self, op: &'static str, name: &str) {
        let epoch = self.chain.bump_epoch();
        self.services
            .metrics
            .counter(metrics::MUTATION_TOTAL)
            .add(1, &[(metrics::ATTR_OP, op)]);
        self.services
            .metrics
            .gauge(metrics::EPOCH)
            .set(epoch as f64, &[]);
        self.logger()
            .info(&format!("pipeline mutation `{op}` on `{name}`, epoch {epoch}"));
    }

    // ---- 查询 ----

    /// 按名称查找阶段。
    pub fn get(&self, name: &str) -> Option<StageId> {
        self.chain
            .load()
            .iter()
            .find(|entry| entry.name() == name)
            .map(|entry| entry.id())
    }

    /// 按实例查找阶段（指针相等）。
    pub fn stage_of(&self, handler: &Arc<dyn Handler>) -> Option<StageId> {
        self.chain
            .load()
            .iter()
            .find(|entry| Arc::ptr_eq(entry.handler(), handler))
            .map(|entry| entry.id())
    }

    /// 罗列当前快照内的全部阶段，顺序与事件入站方向一致。
    pub fn stages(&self) -> Vec<StageRegistration> {
        self.chain
            .load()
            .iter()
            .map(|entry| StageRegistration {
                id: entry.id(),
                name: String::from(entry.name()),
                state: entry.state(),
            })
            .collect()
    }

    // ---- 入站入口（由传输层调用） ----

    /// 宣告连接已注册到执行者。
    pub fn fire_channel_registered(&self) {
        let snapshot = self.chain.load();
        self.dispatch_inbound_from(&snapshot, 0, InboundEvent::Registered);
    }

    /// 宣告连接进入活跃状态。
    pub fn fire_channel_active(&self) {
        let snapshot = self.chain.load();
        self.dispatch_inbound_from(&snapshot, 0, InboundEvent::Active);
    }

    /// 宣告连接离开活跃状态。
    pub fn fire_channel_inactive(&self) {
        let snapshot = self.chain.load();
        self.dispatch_inbound_from(&snapshot, 0, InboundEvent::Inactive);
    }

    /// 注入一条入站消息。
    pub fn fire_channel_read(&self, message: Message) {
        let snapshot = self.chain.load();
        self.dispatch_inbound_from(&snapshot, 0, InboundEvent::Read(message));
    }

    /// 宣告本轮读取结束。
    pub fn fire_channel_read_complete(&self) {
        let snapshot = self.chain.load();
        self.dispatch_inbound_from(&snapshot, 0, InboundEvent::ReadComplete);
    }

    /// 注入自定义用户事件。
    pub fn fire_user_event(&self, event: UserEvent) {
        let snapshot = self.chain.load();
        self.dispatch_inbound_from(&snapshot, 0, InboundEvent::UserEvent(event));
    }

    /// 宣告可写性变化。
    pub fn fire_writability_changed(&self, writable: bool) {
        let snapshot = self.chain.load();
        self.dispatch_inbound_from(&snapshot, 0, InboundEvent::WritabilityChanged(writable));
    }

    /// 从链头注入一条故障，沿异常链传播。
    pub fn fire_exception_caught(&self, cause: PipelineError) {
        let snapshot = self.chain.load();
        self.dispatch_exception_from(&snapshot, 0, cause);
    }

    // ---- 出站入口（由应用调用） ----

    /// 发起绑定，返回观察结果的完成凭证。
    pub fn bind(&self, addr: TransportAddr) -> Completion {
        let completion = Completion::new();
        let snapshot = self.chain.load();
        self.dispatch_outbound_from(
            &snapshot,
            snapshot.len(),
            OutboundEvent::Bind {
                addr,
                completion: completion.clone(),
            },
        );
        completion
    }

    /// 发起连接。
    pub fn connect(&self, remote: TransportAddr, local: Option<TransportAddr>) -> Completion {
        let completion = Completion::new();
        let snapshot = self.chain.load();
        self.dispatch_outbound_from(
            &snapshot,
            snapshot.len(),
            OutboundEvent::Connect {
                remote,
                local,
                completion: completion.clone(),
            },
        );
        completion
    }

    /// 发起断开。
    pub fn disconnect(&self) -> Completion {
        let completion = Completion::new();
        let snapshot = self.chain.load();
        self.dispatch_outbound_from(
            &snapshot,
            snapshot.len(),
            OutboundEvent::Disconnect {
                completion: completion.clone(),
            },
        );
        completion
    }

    /// 发起关闭。
    pub fn close(&self) -> Completion {
        let completion = Completion::new();
        let snapshot = self.chain.load();
        self.dispatch_outbound_from(
            &snapshot,
            snapshot.len(),
            OutboundEvent::Close {
                completion: completion.clone(),
            },
        );
        completion
    }

    /// 请求继续从底层读取。
    pub fn read(&self) {
        let snapshot = self.chain.load();
        self.dispatch_outbound_from(&snapshot, snapshot.len(), OutboundEvent::Read);
    }

    /// 写出一条消息。
    pub fn write(&self, message: Message) -> Completion {
        let completion = Completion::new();
        let snapshot = self.chain.load();
        self.dispatch_outbound_from(
            &snapshot,
            snapshot.len(),
            OutboundEvent::Write {
                message,
                completion: completion.clone(),
            },
        );
        completion
    }

    /// 冲刷挂起数据。
    pub fn flush(&self) {
        let snapshot = self.chain.load();
        self.dispatch_outbound_from(&snapshot, snapshot.len(), OutboundEvent::Flush);
    }

    // ---- 派发内核 ----

    fn next_live(snapshot: &[Arc<StageEntry>], start: usize) -> Option<usize> {
        (start..snapshot.len()).find(|&i| snapshot[i].is_live())
    }

    fn prev_live(snapshot: &[Arc<StageEntry>], upper: usize) -> Option<usize> {
        (0..upper).rev().find(|&i| snapshot[i].is_live())
    }

    pub(crate) fn dispatch_inbound_from(
        &self,
        snapshot: &Arc<Vec<Arc<StageEntry>>>,
        start: usize,
        event: InboundEvent,
    ) {
        match Self::next_live(snapshot, start) {
            Some(index) => self.invoke_inbound(snapshot, index, event),
            None => self.on_inbound_tail(event),
        }
    }

    fn invoke_inbound(
        &self,
        snapshot: &Arc<Vec<Arc<StageEntry>>>,
        index: usize,
        event: InboundEvent,
    ) {
        let entry = Arc::clone(&snapshot[index]);
        let ctx = StageContext::new(self.upgrade_self(), Arc::clone(snapshot), index);
        entry.enter();
        let result = match event {
            InboundEvent::Registered => entry.handler().channel_registered(&ctx),
            InboundEvent::Active => entry.handler().channel_active(&ctx),
            InboundEvent::Inactive => entry.handler().channel_inactive(&ctx),
            InboundEvent::Read(message) => entry.handler().channel_read(&ctx, message),
            InboundEvent::ReadComplete => entry.handler().channel_read_complete(&ctx),
            InboundEvent::UserEvent(user) => entry.handler().user_event(&ctx, user),
            InboundEvent::WritabilityChanged(writable) => {
                entry.handler().writability_changed(&ctx, writable)
            }
        };
        entry.exit();
        if entry.state() == StageState::Detaching {
            self.finish_detach(&entry, snapshot, index);
        }
        if let Err(cause) = result {
            let fault = PipelineError::stage_fault(entry.name(), cause);
            self.dispatch_exception_from(snapshot, index, fault);
        }
    }

    /// 链尾兜底：未被消费的读消息记入诊断，其余入站事件静默结束。
    fn on_inbound_tail(&self, event: InboundEvent) {
        if let InboundEvent::Read(message) = event {
            self.services
                .metrics
                .counter(metrics::DISCARDED_READ_TOTAL)
                .add(1, &[]);
            self.logger().info(&format!(
                "inbound message reached pipeline tail unconsumed, discarding: {message:?}"
            ));
        }
    }

    pub(crate) fn dispatch_outbound_from(
        &self,
        snapshot: &Arc<Vec<Arc<StageEntry>>>,
        upper: usize,
        event: OutboundEvent,
    ) {
        match Self::prev_live(snapshot, upper) {
            Some(index) => self.invoke_outbound(snapshot, index, event),
            None => self.deliver_to_transport(event),
        }
    }

    fn invoke_outbound(
        &self,
        snapshot: &Arc<Vec<Arc<StageEntry>>>,
        index: usize,
        event: OutboundEvent,
    ) {
        let entry = Arc::clone(&snapshot[index]);
        // 槽位失败时需要落定凭证，调用前留存副本。
        let completion = event.completion_handle();
        let ctx = StageContext::new(self.upgrade_self(), Arc::clone(snapshot), index);
        entry.enter();
        let result = match event {
            OutboundEvent::Bind { addr, completion } => entry.handler().bind(&ctx, addr, completion),
            OutboundEvent::Connect {
                remote,
                local,
                completion,
            } => entry.handler().connect(&ctx, remote, local, completion),
            OutboundEvent::Disconnect { completion } => {
                entry.handler().disconnect(&ctx, completion)
            }
            OutboundEvent::Close { completion } => entry.handler().close(&ctx, completion),
            OutboundEvent::Read => entry.handler().read(&ctx),
            OutboundEvent::Write {
                message,
                completion,
            } => entry.handler().write(&ctx, message, completion),
            OutboundEvent::Flush => entry.handler().flush(&ctx),
        };
        entry.exit();
        if entry.state() == StageState::Detaching {
            self.finish_detach(&entry, snapshot, index);
        }
        if let Err(cause) = result {
            let fault = PipelineError::stage_fault(entry.name(), cause);
            match completion {
                // 带凭证的出站操作：失败直接落定凭证，调用方同步可见。
                Some(completion) => {
                    completion.fail(fault);
                }
                // read / flush 无凭证，故障转入入站异常链。
                None => self.dispatch_exception_from(snapshot, index, fault),
            }
        }
    }

    fn deliver_to_transport(&self, event: OutboundEvent) {
        match event {
            OutboundEvent::Bind { addr, completion } => self.transport.bind(addr, completion),
            OutboundEvent::Connect {
                remote,
                local,
                completion,
            } => self.transport.connect(remote, local, completion),
            OutboundEvent::Disconnect { completion } => self.transport.disconnect(completion),
            OutboundEvent::Close { completion } => self.transport.close(completion),
            OutboundEvent::Read => self.transport.begin_read(),
            OutboundEvent::Write {
                message,
                completion,
            } => self.transport.write(message, completion),
            OutboundEvent::Flush => self.transport.flush(),
        }
    }

    pub(crate) fn dispatch_exception_from(
        &self,
        snapshot: &Arc<Vec<Arc<StageEntry>>>,
        start: usize,
        cause: PipelineError,
    ) {
        let index = match Self::next_live(snapshot, start) {
            Some(index) => index,
            None => {
                self.report_unhandled(cause);
                return;
            }
        };
        let entry = Arc::clone(&snapshot[index]);
        let ctx = StageContext::new(self.upgrade_self(), Arc::clone(snapshot), index);
        entry.enter();
        let result = entry.handler().exception_caught(&ctx, cause);
        entry.exit();
        if entry.state() == StageState::Detaching {
            self.finish_detach(&entry, snapshot, index);
        }
        // 异常槽位自身再出错只记录日志并终止传播，避免故障风暴。
        if let Err(secondary) = result {
            self.logger().warn(&format!(
                "exception_caught of `{}` raised while handling a fault, dropping both: {secondary}",
                entry.name(),
            ));
        }
    }

    /// 故障穿透链尾：计数、记日志、经传输层上报，恰好一次。
    fn report_unhandled(&self, cause: PipelineError) {
        self.services
            .metrics
            .counter(metrics::UNHANDLED_FAULT_TOTAL)
            .add(1, &[]);
        let fault = PipelineError::unhandled(cause);
        self.logger()
            .error("fault reached pipeline tail unconsumed", Some(&fault));
        self.transport.on_unhandled_fault(fault);
    }
}

use crate::error::PipelineError;
use crate::message::Message;
use crate::sealed::Sealed;
use alloc::sync::Arc;
use core::fmt;

/// 与平台无关的套接字地址。
///
/// # 设计背景（Why）
/// - `no_std` 环境缺少 `std::net::SocketAddr`，核心 crate 自带一个最小的
///   结构化表示，适配层与 `std` 地址互转。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportAddr {
    /// IPv4 地址与端口。
    V4 { addr: [u8; 4], port: u16 },
    /// IPv6 地址与端口（8 组 16 位段）。
    V6 { addr: [u16; 8], port: u16 },
}

impl fmt::Display for TransportAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportAddr::V4 { addr, port } => {
                write!(f, "{}.{}.{}.{}:{}", addr[0], addr[1], addr[2], addr[3], port)
            }
            TransportAddr::V6 { addr, port } => {
                write!(
                    f,
                    "[{:x}:{:x}:{:x}:{:x}:{:x}:{:x}:{:x}:{:x}]:{}",
                    addr[0], addr[1], addr[2], addr[3], addr[4], addr[5], addr[6], addr[7], port
                )
            }
        }
    }
}

#[derive(Debug)]
enum CompletionState {
    Pending,
    Succeeded,
    Failed(PipelineError),
}

#[derive(Debug)]
struct CompletionInner {
    state: spin::Mutex<CompletionState>,
}

/// 出站操作的完成凭证。
///
/// # 设计背景（Why）
/// - 出站操作（bind / connect / write 等）跨越整条 Handler 链后才抵达传输
///   层，调用方需要一个凭证来观察最终成败；链中任何 Handler 的故障与传输层
///   的真实结果竞争时，必须只有一方胜出。
///
/// # 逻辑解析（How）
/// - 内部用 `spin::Mutex` 守护三态机（Pending → Succeeded / Failed）；
/// - [`succeed`](Self::succeed) 与 [`fail`](Self::fail) 均为先到先得，第二次
///   落定返回 `false` 并被丢弃。
///
/// # 契约说明（What）
/// - **后置条件**：状态一旦离开 `Pending` 不再变化；`Clone` 共享同一状态。
#[derive(Clone, Debug)]
pub struct Completion {
    inner: Arc<CompletionInner>,
}

impl Completion {
    /// 创建处于 `Pending` 状态的凭证。
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CompletionInner {
                state: spin::Mutex::new(CompletionState::Pending),
            }),
        }
    }

    /// 标记成功；返回是否由本次调用完成落定。
    pub fn succeed(&self) -> bool {
        let mut state = self.inner.state.lock();
        match *state {
            CompletionState::Pending => {
                *state = CompletionState::Succeeded;
                true
            }
            _ => false,
        }
    }

    /// 标记失败；返回是否由本次调用完成落定。
    pub fn fail(&self, error: PipelineError) -> bool {
        let mut state = self.inner.state.lock();
        match *state {
            CompletionState::Pending => {
                *state = CompletionState::Failed(error);
                true
            }
            _ => false,
        }
    }

    /// 是否已经落定。
    pub fn is_done(&self) -> bool {
        !matches!(*self.inner.state.lock(), CompletionState::Pending)
    }

    /// 是否落定为成功。
    pub fn is_succeeded(&self) -> bool {
        matches!(*self.inner.state.lock(), CompletionState::Succeeded)
    }

    /// 是否落定为失败。
    pub fn is_failed(&self) -> bool {
        matches!(*self.inner.state.lock(), CompletionState::Failed(_))
    }

    /// 若落定为失败，返回失败错误码。
    pub fn failure_code(&self) -> Option<&'static str> {
        match &*self.inner.state.lock() {
            CompletionState::Failed(err) => Some(err.code()),
            _ => None,
        }
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

/// 链路下游的传输层抽象。
///
/// # 设计背景（Why）
/// - 出站事件沿链走到头部哨兵后必须有明确归宿；该 Trait 即头部哨兵背后的
///   真实 I/O 终点，由各传输适配层实现（TCP、内存管道、测试桩等）。
///
/// # 契约说明（What）
/// - 所有带 [`Completion`] 的方法由实现负责最终落定凭证；
/// - [`on_unhandled_fault`](Self::on_unhandled_fault) 是连接级健康信号：当
///   故障穿透整条异常链无人消费时由链路调用，实现可据此关闭连接或上报。
pub trait Transport: Send + Sync + Sealed + 'static {
    /// 绑定本地地址。
    fn bind(&self, addr: TransportAddr, completion: Completion);
    /// 连接远端，可选指定本地地址。
    fn connect(&self, remote: TransportAddr, local: Option<TransportAddr>, completion: Completion);
    /// 断开连接。
    fn disconnect(&self, completion: Completion);
    /// 关闭连接。
    fn close(&self, completion: Completion);
    /// 请求继续从底层读取。
    fn begin_read(&self);
    /// 写出一条消息。
    fn write(&self, message: Message, completion: Completion);
    /// 冲刷挂起的写出数据。
    fn flush(&self);
    /// 接收穿透整条异常链的未消费故障。
    fn on_unhandled_fault(&self, fault: PipelineError);
}

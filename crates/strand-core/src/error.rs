use crate::sealed::Sealed;
use alloc::{borrow::Cow, boxed::Box, string::String};
use core::fmt;

/// `strand-core` 中所有错误必须实现的 `no_std` 基础 Trait。
///
/// # 设计背景（Why）
/// - `std::error::Error` 在 `no_std` 环境中不可用，因此需要一个对象安全、
///   与平台无关的错误抽象来串联底层错误链。
///
/// # 逻辑解析（How）
/// - 约束实现者提供 `Debug` 与 `Display`，便于日志与可观测性收集；
/// - `source` 递归返回上游错误，语义与 `std::error::Error::source` 对齐。
///
/// # 契约说明（What）
/// - **前置条件**：需要跨线程传递时，实现类型应满足 `Send + Sync + 'static`
///   （参见 [`ErrorCause`] 类型别名）。
/// - **后置条件**：`source` 返回的引用生命周期受限于 `self`，防止悬垂。
pub trait Error: fmt::Debug + fmt::Display + Sealed {
    /// 返回当前错误的上游来源。
    fn source(&self) -> Option<&(dyn Error + 'static)>;
}

impl<E> Error for Box<E>
where
    E: Error + ?Sized,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        (**self).source()
    }
}

/// 可跨线程传递的底层错误原因。
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// 链路引擎的稳定错误码集合。
///
/// # 契约说明（What）
/// - 错误码遵循 `<域>.<语义>` 约定，进入日志或指标后不得变更；
/// - 调用方据此做机读分类，禁止解析 `message` 字符串推断语义。
pub mod codes {
    /// 同名 Handler 已存在于目标链路。
    pub const DUPLICATE_NAME: &str = "pipeline.duplicate_name";
    /// 非共享 Handler 实例已附着到其他链路。
    pub const DUPLICATE_ATTACHMENT: &str = "pipeline.duplicate_attachment";
    /// 按名称或实例查找 Handler 失败。
    pub const HANDLER_NOT_FOUND: &str = "pipeline.handler_not_found";
    /// 某个 Handler 回调在派发过程中产生故障。
    pub const STAGE_FAULT: &str = "pipeline.stage_fault";
    /// 故障穿透了整条异常链而无人消费。
    pub const UNHANDLED_FAULT: &str = "pipeline.unhandled_fault";
}

/// 链路引擎的统一错误载体。
///
/// # 设计背景（Why）
/// - 链路的同步失败（重名、重复附着、查找未命中）与派发期故障（Handler 回调
///   出错、无人消费）需要合流为统一的错误码域，供日志、指标与传输层健康信号
///   执行精确分类；
/// - 框架兼容 `no_std + alloc`，因此不依赖 `std::error::Error`，而是复用本
///   crate 的 [`Error`] 抽象。
///
/// # 逻辑解析（How）
/// - 结构体承载稳定 `code`、人类可读 `message` 与可选底层 `cause`，通过
///   `source()` 暴露完整错误链；
/// - [`kind`](Self::kind) 按错误码映射为 [`PipelineErrorKind`]，驱动上层的
///   自动化处置（同步返回调用方、转入异常链或上报传输层）。
///
/// # 契约说明（What）
/// - **前置条件**：构造时使用 [`codes`] 中备案的错误码，或遵循同样命名约定的
///   自定义码值；
/// - **后置条件**：返回值拥有独立所有权，满足 `Send + Sync + 'static`，可在
///   线程间安全传递。
#[derive(Debug)]
pub struct PipelineError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
}

impl PipelineError {
    /// 构造新的链路错误。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 构造 `DuplicateName` 错误。
    pub fn duplicate_name(name: &str) -> Self {
        Self::new(
            codes::DUPLICATE_NAME,
            alloc::format!("handler name `{name}` already registered in this pipeline"),
        )
    }

    /// 构造 `DuplicateAttachment` 错误。
    pub fn duplicate_attachment(name: &str) -> Self {
        Self::new(
            codes::DUPLICATE_ATTACHMENT,
            alloc::format!("non-sharable handler `{name}` is already attached to another pipeline"),
        )
    }

    /// 构造 `HandlerNotFound` 错误。
    pub fn handler_not_found(what: &str) -> Self {
        Self::new(
            codes::HANDLER_NOT_FOUND,
            alloc::format!("no handler matches `{what}` in this pipeline"),
        )
    }

    /// 将某个 Handler 回调产生的故障包装为 `StageFault`。
    ///
    /// # 契约说明（What）
    /// - `stage`：产生故障的 Handler 名称，进入 `message` 供排障定位；
    /// - `cause`：回调返回的原始错误，保留在错误链中供 `source()` 追溯。
    pub fn stage_fault(stage: &str, cause: PipelineError) -> Self {
        Self::new(
            codes::STAGE_FAULT,
            alloc::format!("handler `{stage}` raised during dispatch"),
        )
        .with_cause(cause)
    }

    /// 将穿透整条异常链的故障标记为 `UnhandledFault`。
    pub fn unhandled(cause: PipelineError) -> Self {
        Self::new(
            codes::UNHANDLED_FAULT,
            "fault reached the pipeline tail without being consumed",
        )
        .with_cause(cause)
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取人类可读描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// 返回错误的机读分类。
    ///
    /// # 契约说明（What）
    /// - 分类完全由错误码决定，与 `message` 内容无关；
    /// - 未备案的自定义码值归入 [`PipelineErrorKind::Other`]，提醒调用方补充
    ///   约定或显式处理。
    pub fn kind(&self) -> PipelineErrorKind {
        match self.code {
            codes::DUPLICATE_NAME => PipelineErrorKind::DuplicateName,
            codes::DUPLICATE_ATTACHMENT => PipelineErrorKind::DuplicateAttachment,
            codes::HANDLER_NOT_FOUND => PipelineErrorKind::HandlerNotFound,
            codes::STAGE_FAULT => PipelineErrorKind::StageFault,
            codes::UNHANDLED_FAULT => PipelineErrorKind::UnhandledFault,
            _ => PipelineErrorKind::Other,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn Error + 'static))
    }
}

/// 错误分类枚举，覆盖链路引擎的全部用户可见失败形态。
///
/// # 契约说明（What）
/// - `DuplicateName` / `DuplicateAttachment` / `HandlerNotFound`：变更与查找
///   操作的同步失败，直接返回调用方；
/// - `StageFault`：派发期由 Handler 回调产生，转入同方向的异常链；
/// - `UnhandledFault`：异常链穷尽后上报传输层的连接级健康信号；
/// - `Other`：未备案的扩展码值。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PipelineErrorKind {
    DuplicateName,
    DuplicateAttachment,
    HandlerNotFound,
    StageFault,
    UnhandledFault,
    Other,
}

/// `strand-core` 统一 Result 别名。
pub type Result<T, E = PipelineError> = core::result::Result<T, E>;

/// 便于测试与适配层将任意文本包装为错误链节点的轻量类型。
#[derive(Debug)]
pub struct MessageError(pub String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for MessageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

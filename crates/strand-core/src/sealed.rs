//! 内部 sealed 模块，约束公开 Trait 的演进边界。
//!
//! # 设计背景（Why）
//! - `strand-core` 对外暴露 `Handler`、`Context`、`Transport` 等可实现 Trait，
//!   需要在 SemVer 框架下为未来新增默认方法或收紧约束保留空间。
//!
//! # 逻辑解析（How）
//! - 定义 crate 私有 Trait `Sealed` 并提供 blanket 实现；
//! - 公开 Trait 通过 `: crate::sealed::Sealed` 间接引用该标记；
//! - 若未来需要限制实现者集合，只需收紧 blanket 实现条件，公开签名保持不变。
//!
//! # 风险与考量（Trade-offs）
//! - 当前的 blanket 实现不会真正限制实现者，调用方（含测试）可以自由实现各 Trait；
//!   这是刻意选择，链路引擎的价值正在于外部 Handler 生态。
pub(crate) trait Sealed {}

impl<T: ?Sized> Sealed for T {}

//! # strand-core
//!
//! 面向连接的双向 Handler 链路内核，兼容 `no_std + alloc`。
//!
//! 一条连接对应一条 [`pipeline::Pipeline`]：入站事件（注册、活跃、读取等）
//! 自传输层进入，沿链从头部流向尾部；出站操作（绑定、写出、关闭等）自应用
//! 发起，反向流回头部后交付 [`transport::Transport`]。Handler 只覆写自己
//! 关心的槽位，未覆写的事件由默认实现原样转发。
//!
//! ## 核心约定
//! - **热插拔**：链路结构可在运行期增删 Handler，变更以"复制-替换"快照
//!   发布，进行中的事件传播不受影响；
//! - **故障即数据**：Handler 槽位以 `Err` 表达故障，由链路沿异常链路由，
//!   穿透链尾的故障经传输层健康信号上报，且恰好一次；
//! - **附着约束**：非共享 Handler 实例同一时刻只能附着到一条链路，共享
//!   实例（`is_sharable`）可同时服务多条连接。
//!
//! ## 并发模型
//! 同一连接的事件派发由单一执行者串行驱动；结构变更可来自任意线程，由链路
//! 内部互斥锁串行化。

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![allow(private_bounds)]

extern crate alloc;

mod sealed;

pub mod error;
pub mod message;
pub mod observability;
pub mod pipeline;
pub mod prelude;
pub mod runtime;
pub mod test_stubs;
pub mod transport;

pub use error::{PipelineError, PipelineErrorKind, Result};
pub use message::{Message, UserEvent};
pub use pipeline::{
    AttachmentCell, Context, Handler, Pipeline, PipelineFactory, StageId, StageRegistration,
    StageState,
};
pub use runtime::Services;
pub use transport::{Completion, Transport, TransportAddr};

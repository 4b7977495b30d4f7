//! 双向 Handler 链路：事件派发、热插拔变更与阶段生命周期。

mod context;
mod factory;
mod handler;
mod internal;
#[allow(clippy::module_inception)]
mod pipeline;

pub use context::Context;
pub use factory::PipelineFactory;
pub use handler::{AttachmentCell, Handler};
pub use pipeline::{Pipeline, StageId, StageRegistration, StageState};

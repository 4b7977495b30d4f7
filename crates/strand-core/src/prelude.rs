//! 常用类型一站式导入。

pub use crate::error::{PipelineError, PipelineErrorKind, Result};
pub use crate::message::{Message, UserEvent};
pub use crate::pipeline::{
    AttachmentCell, Context, Handler, Pipeline, PipelineFactory, StageId, StageRegistration,
    StageState,
};
pub use crate::runtime::Services;
pub use crate::transport::{Completion, Transport, TransportAddr};

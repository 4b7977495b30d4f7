//! 故障路由：异常链传播、出站凭证落定与未消费故障上报。

use std::sync::Arc;

use strand_core::error::{codes, PipelineError};
use strand_core::prelude::*;
use strand_core::test_stubs::{
    noop_services, NoopMetricsProvider, RecordingLogger, RecordingTransport, TransportOp,
};

use crate::support::{self, Catcher, Faulty, Forwarder};

/// 出站写出槽位必然失败的 Handler。
struct FaultyWriter {
    attachment: AttachmentCell,
}

impl FaultyWriter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for FaultyWriter {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn write(&self, _ctx: &dyn Context, _message: Message, _completion: Completion) -> Result<()> {
        Err(PipelineError::new("app.encode", "refusing to encode"))
    }
}

/// 出站冲刷槽位必然失败的 Handler。
struct FaultyFlusher {
    attachment: AttachmentCell,
}

impl FaultyFlusher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for FaultyFlusher {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn flush(&self, _ctx: &dyn Context) -> Result<()> {
        Err(PipelineError::new("app.flush", "flush rejected"))
    }
}

/// 处理故障时自身再出错的异常槽位。
struct BadCatcher {
    attachment: AttachmentCell,
}

impl BadCatcher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            attachment: AttachmentCell::new(),
        })
    }
}

impl Handler for BadCatcher {
    fn attachment(&self) -> &AttachmentCell {
        &self.attachment
    }

    fn exception_caught(&self, _ctx: &dyn Context, _cause: PipelineError) -> Result<()> {
        Err(PipelineError::new("app.catcher", "catcher itself failed"))
    }
}

#[test]
fn fault_propagates_from_faulting_stage_to_tailward_stages_only() {
    let log = support::new_log();
    let transport = RecordingTransport::new_arc();
    let pipeline = Pipeline::new(transport.clone(), noop_services());
    pipeline
        .add_last("upstream", Forwarder::new("upstream", &log))
        .expect("挂载必须成功");
    pipeline
        .add_last("faulty", Faulty::new())
        .expect("挂载必须成功");
    pipeline
        .add_last("catcher", Catcher::new("catcher", &log))
        .expect("挂载必须成功");

    pipeline.fire_channel_read(Message::from_bytes([1]));

    let events = support::drain(&log);
    assert_eq!(
        events,
        [
            String::from("upstream:read"),
            format!("catcher:caught:{}", codes::STAGE_FAULT),
        ],
        "故障只能被故障阶段及其尾侧阶段观察到",
    );
    assert_eq!(transport.fault_count(), 0, "被消费的故障不得上报传输层");
}

#[test]
fn unconsumed_fault_is_reported_exactly_once() {
    let log = support::new_log();
    let logger = RecordingLogger::new_arc();
    let services = Services::new(logger.clone(), Arc::new(NoopMetricsProvider));
    let transport = RecordingTransport::new_arc();
    let pipeline = Pipeline::new(transport.clone(), services);
    pipeline
        .add_last("upstream", Forwarder::new("upstream", &log))
        .expect("挂载必须成功");
    pipeline
        .add_last("faulty", Faulty::new())
        .expect("挂载必须成功");

    pipeline.fire_channel_read(Message::from_bytes([1]));

    let faults = transport.take_faults();
    assert_eq!(faults.len(), 1, "穿透链尾的故障必须恰好上报一次");
    assert_eq!(faults[0].kind(), PipelineErrorKind::UnhandledFault);
    assert!(
        logger
            .take_lines()
            .iter()
            .any(|line| line.starts_with("ERROR")),
        "未消费故障必须产生错误日志",
    );
}

#[test]
fn outbound_fault_settles_the_completion() {
    let transport = RecordingTransport::new_arc();
    let pipeline = Pipeline::new(transport.clone(), noop_services());
    pipeline
        .add_last("writer", FaultyWriter::new())
        .expect("挂载必须成功");

    let completion = pipeline.write(Message::from_bytes([1]));

    assert!(completion.is_failed(), "出站故障必须落定失败凭证");
    assert_eq!(completion.failure_code(), Some(codes::STAGE_FAULT));
    assert!(
        !matches!(transport.take_ops().as_slice(), [TransportOp::Write(_), ..]),
        "故障截断后写出不得抵达传输层",
    );
    assert_eq!(transport.fault_count(), 0, "已落定凭证的故障不再走异常链");
}

#[test]
fn flush_fault_routes_to_exception_chain() {
    let log = support::new_log();
    let transport = RecordingTransport::new_arc();
    let pipeline = Pipeline::new(transport.clone(), noop_services());
    pipeline
        .add_last("flusher", FaultyFlusher::new())
        .expect("挂载必须成功");
    pipeline
        .add_last("catcher", Catcher::new("catcher", &log))
        .expect("挂载必须成功");

    pipeline.flush();

    assert_eq!(
        support::drain(&log),
        [format!("catcher:caught:{}", codes::STAGE_FAULT)],
        "无凭证的出站故障必须转入入站异常链",
    );
    assert!(transport.take_ops().is_empty(), "故障截断后冲刷不得抵达传输层");
}

#[test]
fn fault_in_exception_slot_is_logged_and_dropped() {
    let logger = RecordingLogger::new_arc();
    let services = Services::new(logger.clone(), Arc::new(NoopMetricsProvider));
    let transport = RecordingTransport::new_arc();
    let pipeline = Pipeline::new(transport.clone(), services);
    pipeline
        .add_last("faulty", Faulty::new())
        .expect("挂载必须成功");
    pipeline
        .add_last("bad-catcher", BadCatcher::new())
        .expect("挂载必须成功");

    pipeline.fire_channel_read(Message::from_bytes([1]));

    assert_eq!(
        transport.fault_count(),
        0,
        "异常槽位自身的故障被丢弃，不得再次上报",
    );
    assert!(
        logger
            .take_lines()
            .iter()
            .any(|line| line.starts_with("WARN")),
        "异常槽位自身的故障必须留下告警日志",
    );
}

#[test]
fn injected_fault_from_head_walks_whole_chain() {
    let log = support::new_log();
    let transport = RecordingTransport::new_arc();
    let pipeline = Pipeline::new(transport.clone(), noop_services());
    pipeline
        .add_last("relay", Forwarder::new("relay", &log))
        .expect("挂载必须成功");
    pipeline
        .add_last("catcher", Catcher::new("catcher", &log))
        .expect("挂载必须成功");

    pipeline.fire_exception_caught(PipelineError::new("transport.io", "broken pipe"));

    assert_eq!(
        support::drain(&log),
        ["relay:exception", "catcher:caught:transport.io"],
        "从链头注入的故障必须按顺序经过全部异常槽位",
    );
    assert_eq!(transport.fault_count(), 0);
}

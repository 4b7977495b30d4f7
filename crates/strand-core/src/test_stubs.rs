//! 面向测试与适配层示例的标准桩实现。
//!
//! 核心 crate 不绑定任何日志/指标后端，测试用例通过这里的 Noop / Recording
//! 桩组装 [`Services`] 与 [`Transport`]，并回放链路对外的全部副作用。

use crate::error::{Error, PipelineError};
use crate::message::Message;
use crate::observability::{Counter, Gauge, Logger, MetricsProvider};
use crate::runtime::Services;
use crate::transport::{Completion, Transport, TransportAddr};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// 丢弃一切输出的日志桩。
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str, _cause: Option<&dyn Error>) {}
}

/// 把日志逐行收进内存的日志桩，供断言使用。
pub struct RecordingLogger {
    lines: spin::Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self {
            lines: spin::Mutex::new(Vec::new()),
        })
    }

    /// 取走已记录的全部日志行。
    pub fn take_lines(&self) -> Vec<String> {
        core::mem::take(&mut *self.lines.lock())
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.lines.lock().push(format!("INFO {message}"));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().push(format!("WARN {message}"));
    }

    fn error(&self, message: &str, cause: Option<&dyn Error>) {
        let mut line = format!("ERROR {message}");
        if let Some(cause) = cause {
            line.push_str(&format!(" cause={cause}"));
        }
        self.lines.lock().push(line);
    }
}

struct NoopCounter;

impl Counter for NoopCounter {
    fn add(&self, _value: u64, _labels: &[(&'static str, &'static str)]) {}
}

struct NoopGauge;

impl Gauge for NoopGauge {
    fn set(&self, _value: f64, _labels: &[(&'static str, &'static str)]) {}
}

/// 丢弃一切样本的指标桩。
pub struct NoopMetricsProvider;

impl MetricsProvider for NoopMetricsProvider {
    fn counter(&self, _name: &'static str) -> Box<dyn Counter> {
        Box::new(NoopCounter)
    }

    fn gauge(&self, _name: &'static str) -> Box<dyn Gauge> {
        Box::new(NoopGauge)
    }
}

/// 组装全 Noop 的服务集合。
pub fn noop_services() -> Services {
    Services::new(Arc::new(NoopLogger), Arc::new(NoopMetricsProvider))
}

/// [`RecordingTransport`] 回放的一次传输层调用。
#[derive(Debug)]
pub enum TransportOp {
    Bind(TransportAddr),
    Connect(TransportAddr),
    Disconnect,
    Close,
    Read,
    Write(Message),
    Flush,
}

/// 记录全部调用并立即落定成功的传输层桩。
///
/// 穿透链尾的未消费故障单独存放，用于验证"恰好一次上报"。
pub struct RecordingTransport {
    ops: spin::Mutex<Vec<TransportOp>>,
    faults: spin::Mutex<Vec<PipelineError>>,
}

impl RecordingTransport {
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self {
            ops: spin::Mutex::new(Vec::new()),
            faults: spin::Mutex::new(Vec::new()),
        })
    }

    /// 取走已记录的全部调用。
    pub fn take_ops(&self) -> Vec<TransportOp> {
        core::mem::take(&mut *self.ops.lock())
    }

    /// 已记录的调用条数。
    pub fn op_count(&self) -> usize {
        self.ops.lock().len()
    }

    /// 取走已上报的全部未消费故障。
    pub fn take_faults(&self) -> Vec<PipelineError> {
        core::mem::take(&mut *self.faults.lock())
    }

    /// 已上报的未消费故障条数。
    pub fn fault_count(&self) -> usize {
        self.faults.lock().len()
    }
}

impl Transport for RecordingTransport {
    fn bind(&self, addr: TransportAddr, completion: Completion) {
        self.ops.lock().push(TransportOp::Bind(addr));
        completion.succeed();
    }

    fn connect(&self, remote: TransportAddr, _local: Option<TransportAddr>, completion: Completion) {
        self.ops.lock().push(TransportOp::Connect(remote));
        completion.succeed();
    }

    fn disconnect(&self, completion: Completion) {
        self.ops.lock().push(TransportOp::Disconnect);
        completion.succeed();
    }

    fn close(&self, completion: Completion) {
        self.ops.lock().push(TransportOp::Close);
        completion.succeed();
    }

    fn begin_read(&self) {
        self.ops.lock().push(TransportOp::Read);
    }

    fn write(&self, message: Message, completion: Completion) {
        self.ops.lock().push(TransportOp::Write(message));
        completion.succeed();
    }

    fn flush(&self) {
        self.ops.lock().push(TransportOp::Flush);
    }

    fn on_unhandled_fault(&self, fault: PipelineError) {
        self.faults.lock().push(fault);
    }
}

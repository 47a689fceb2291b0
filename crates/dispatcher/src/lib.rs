//! # Dispatcher
//!
//! 帧记录落盘模块。
//!
//! 负责：
//! - `NpzSink`: 每视角每帧一个压缩 `.npz` 归档
//! - `LogSink`: 只记录摘要 (调试 / dry run)
//! - 按名称创建 sink

pub mod error;
pub mod metrics;
pub mod npy;
pub mod sinks;

pub use contracts::{CapturedFrame, FrameSink};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{create_sink, LogSink, NpzSink, SinkKind};

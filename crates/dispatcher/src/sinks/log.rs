//! LogSink - logs record summaries via tracing

use contracts::{CapturedFrame, ContractError, FrameSink, ViewName};
use tracing::{info, instrument};

use crate::metrics::SinkMetrics;

/// Sink that logs record summaries for debugging
pub struct LogSink {
    name: String,
    metrics: SinkMetrics,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metrics: SinkMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    fn log_record_summary(&self, view: &ViewName, frame: &CapturedFrame) {
        info!(
            sink = %self.name,
            view = %view,
            simulation_id = %frame.simulation_id,
            grab_index = frame.grab_index,
            image = ?frame.image.as_ref().map(|a| a.dim()),
            depth = ?frame.depth_map.as_ref().map(|a| a.dim()),
            fov = frame.fov,
            "CapturedFrame received"
        );
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, grab_index = frame.grab_index)
    )]
    fn write(&self, view: &ViewName, frame: &CapturedFrame) -> Result<(), ContractError> {
        self.log_record_summary(view, frame);
        self.metrics.record_write(0);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    fn flush(&self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> CapturedFrame {
        CapturedFrame {
            origin: [0.0, 0.0],
            focal_length: 1.0,
            fov: 90.0,
            grab_index: 1,
            pose_matrix_view_to_main: [[0.0; 4]; 4],
            simulation_id: "clip".into(),
            image: None,
            depth_map: None,
        }
    }

    #[test]
    fn test_log_sink_write() {
        let sink = LogSink::new("test_log");
        assert!(sink.write(&ViewName::center("main"), &frame()).is_ok());
        assert!(sink.flush().is_ok());
        assert_eq!(sink.metrics().write_count(), 1);
    }

    #[test]
    fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}

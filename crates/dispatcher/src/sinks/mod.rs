//! Sink implementations
//!
//! Contains NpzSink and LogSink, plus creation by kind.

mod log;
mod npz;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use contracts::FrameSink;
use tracing::instrument;

use crate::error::DispatcherError;

pub use self::log::LogSink;
pub use self::npz::NpzSink;

/// Sink selected by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    /// Compressed archive per record
    #[default]
    Npz,
    /// Summary log only
    Log,
}

impl FromStr for SinkKind {
    type Err = DispatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npz" => Ok(Self::Npz),
            "log" => Ok(Self::Log),
            _ => Err(DispatcherError::UnknownSinkKind(s.to_string())),
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Npz => write!(f, "npz"),
            SinkKind::Log => write!(f, "log"),
        }
    }
}

/// Create a sink of `kind`; `base_path` is only used by file-backed sinks
#[instrument(name = "dispatcher_create_sink", skip(base_path), fields(base_path = %base_path.display()))]
pub fn create_sink(
    kind: SinkKind,
    name: &str,
    base_path: &Path,
) -> Result<Arc<dyn FrameSink>, DispatcherError> {
    match kind {
        SinkKind::Log => Ok(Arc::new(LogSink::new(name))),
        SinkKind::Npz => Ok(Arc::new(NpzSink::new(name, base_path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_kind_parse() {
        assert_eq!("npz".parse::<SinkKind>().unwrap(), SinkKind::Npz);
        assert_eq!("LOG".parse::<SinkKind>().unwrap(), SinkKind::Log);
        assert!(matches!(
            "parquet".parse::<SinkKind>(),
            Err(DispatcherError::UnknownSinkKind(_))
        ));
        assert_eq!(SinkKind::Log.to_string(), "log");
    }

    #[test]
    fn test_create_sink() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let sink = create_sink(SinkKind::Npz, "archive", &out).unwrap();
        assert_eq!(sink.name(), "archive");
        assert!(out.is_dir());

        let sink = create_sink(SinkKind::Log, "log", &out).unwrap();
        assert_eq!(sink.name(), "log");
    }
}

//! Session registry entries

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{CapturedFrame, FrameSink, ViewName};

/// Opaque handle captured by sensor callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Scope of one capture session
#[derive(Clone)]
pub struct SessionConfig {
    pub car_name: String,
    pub sector: String,
    pub simulation_id: String,
    /// Where records of this session are persisted
    pub sink: Arc<dyn FrameSink>,
}

impl SessionConfig {
    pub fn new(
        car_name: impl Into<String>,
        sector: impl Into<String>,
        simulation_id: impl Into<String>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            car_name: car_name.into(),
            sector: sector.into(),
            simulation_id: simulation_id.into(),
            sink,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("car_name", &self.car_name)
            .field("sector", &self.sector)
            .field("simulation_id", &self.simulation_id)
            .field("sink", &self.sink.name())
            .finish()
    }
}

/// Live session: configuration plus the single pending center-view slot
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) config: SessionConfig,
    pub(crate) center_view: ViewName,
    pending: Mutex<Option<CapturedFrame>>,
}

impl Session {
    pub(crate) fn new(config: SessionConfig) -> Self {
        let center_view = ViewName::center(&config.sector);
        Self {
            config,
            center_view,
            pending: Mutex::new(None),
        }
    }

    /// Sinks never run under this lock; a poisoned slot still holds a whole frame
    pub(crate) fn pending(&self) -> MutexGuard<'_, Option<CapturedFrame>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! FrameSink trait - persistence interface
//!
//! Sinks are called from engine callback threads, so `write` takes `&self`
//! and implementations use interior mutability.

use crate::{CapturedFrame, ContractError, ViewName};

/// Frame persistence trait
pub trait FrameSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one record of `view`
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn write(&self, view: &ViewName, frame: &CapturedFrame) -> Result<(), ContractError>;

    /// Flush buffered output (if any)
    fn flush(&self) -> Result<(), ContractError> {
        Ok(())
    }
}

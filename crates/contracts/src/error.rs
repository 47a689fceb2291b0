//! Layered error definitions
//!
//! Categorized by source: config / carla / decode / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error (missing file, syntax, wrong types)
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== CARLA Errors =====
    /// CARLA connection error
    #[error("carla connection error: {message}")]
    CarlaConnection { message: String },

    /// CARLA refused to spawn a sensor
    #[error("carla spawn error for '{sensor}': {message}")]
    CarlaSpawn { sensor: String, message: String },

    // ===== Decode Errors =====
    /// Raw sensor buffer could not be decoded
    #[error("payload decode error for view '{view}': {message}")]
    PayloadDecode { view: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create CARLA spawn error
    pub fn carla_spawn(sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CarlaSpawn {
            sensor: sensor.into(),
            message: message.into(),
        }
    }

    /// Create payload decode error
    pub fn payload_decode(view: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PayloadDecode {
            view: view.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration category
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. } | Self::ConfigValidation { .. }
        )
    }
}

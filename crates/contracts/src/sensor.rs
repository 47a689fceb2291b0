//! RawImage - engine callback payload
//!
//! Raw camera buffer as delivered by the simulator.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Camera sensor flavour attached to a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// BGRA color camera
    Color,
    /// BGRA-encoded depth camera
    Depth,
}

impl SensorKind {
    /// CARLA blueprint name
    pub fn blueprint(&self) -> &'static str {
        match self {
            SensorKind::Color => "sensor.camera.rgb",
            SensorKind::Depth => "sensor.camera.depth",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Color => f.write_str("color"),
            SensorKind::Depth => f.write_str("depth"),
        }
    }
}

/// Raw camera frame
///
/// `data` holds `width * height` BGRA pixels, rows top-down.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Engine frame counter (grab index)
    pub frame: u64,

    /// Simulation timestamp (seconds)
    pub timestamp: f64,

    /// Buffer width in pixels
    pub width: u32,

    /// Buffer height in pixels
    pub height: u32,

    /// Interleaved BGRA bytes (zero-copy)
    pub data: Bytes,
}

impl RawImage {
    /// Expected byte length for the declared dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

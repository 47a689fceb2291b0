//! SensorSource trait - Sensor data source abstraction
//!
//! Decouples the capture callback from the concrete sensor implementation, so
//! real CARLA cameras and mock cameras are driven through the same API.

use std::sync::Arc;

use crate::{RawImage, SensorKind};

/// Sensor data callback type
///
/// Invoked on the engine's thread once per sensor tick. Uses `Arc` so one
/// callback can be shared across contexts.
pub type SensorDataCallback = Arc<dyn Fn(RawImage) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let sensor: Box<dyn SensorSource> = client.get_sensor_source(actor_id, label, kind)?;
/// sensor.listen(Arc::new(|image| {
///     println!("frame {}", image.frame);
/// }));
/// // ... capture ...
/// sensor.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Get sensor label
    fn sensor_id(&self) -> &str;

    /// Get sensor kind
    fn sensor_kind(&self) -> SensorKind;

    /// Register data callback
    ///
    /// Repeated calls while listening are ignored (no second callback is registered).
    fn listen(&self, callback: SensorDataCallback);

    /// Stop listening
    ///
    /// A callback already executing may still complete after `stop` returns.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}

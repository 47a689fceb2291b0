//! CARLA client abstraction
//!
//! Defines traits for interacting with CARLA, supporting real implementation and mock testing.

use std::collections::HashMap;
use std::future::Future;

use contracts::{ActorId, SensorKind, SensorSource, Transform};

use tracing::warn;

use crate::error::Result;

/// Attributes that define the camera geometry recorded with every frame
pub const GEOMETRY_ATTRIBUTES: [&str; 3] = ["image_size_x", "image_size_y", "fov"];

/// Apply blueprint attributes in key order through `set`.
///
/// `set` returns false when the blueprint rejects an attribute. A rejected
/// geometry attribute fails the spawn (the engine would render with a
/// different focal length than the one recorded); any other rejection is
/// logged and skipped.
pub fn apply_attributes<F>(
    attributes: &HashMap<String, String>,
    mut set: F,
) -> std::result::Result<(), String>
where
    F: FnMut(&str, &str) -> bool,
{
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    for key in keys {
        let value = &attributes[key];
        if set(key, value) {
            continue;
        }
        if GEOMETRY_ATTRIBUTES.contains(&key.as_str()) {
            return Err(format!("blueprint rejected attribute {key}={value}"));
        }
        warn!(key = %key, value = %value, "failed to set sensor attribute");
    }
    Ok(())
}

/// CARLA client trait
///
/// Abstracts CARLA core operations for testing and future implementation replacement.
/// Supports unified interface for real CARLA client and Mock client.
pub trait CarlaClient: Send + Sync {
    /// Connect to CARLA server
    fn connect(&mut self, host: &str, port: u16) -> impl Future<Output = Result<()>> + Send;

    /// Spawn vehicle
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "vehicle.tesla.model3"
    /// * `transform` - Initial pose (None = first recommended spawn point)
    ///
    /// # Returns
    /// Newly created actor ID
    fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Option<Transform>,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Spawn sensor and attach to parent actor
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "sensor.camera.rgb"
    /// * `transform` - Pose relative to parent actor (engine axes)
    /// * `parent_id` - Parent actor ID
    /// * `attributes` - Blueprint attributes (`image_size_x`, `fov`, `sensor_tick`, ...)
    ///
    /// # Returns
    /// Newly created sensor actor ID
    fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Destroy actor
    ///
    /// Idempotent operation: returns Ok if actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Check if actor exists
    fn actor_exists(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Get sensor data source
    ///
    /// Returns an object implementing `SensorSource`; the camera rig registers
    /// its capture callback through it, for mock and real sensors alike.
    ///
    /// # Arguments
    /// * `actor_id` - Sensor's actor ID
    /// * `label` - Sensor label (for logging and tracing)
    /// * `kind` - Color or depth
    ///
    /// # Returns
    /// Boxed trait object implementing `SensorSource`, None if actor doesn't exist
    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        label: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>>;
}

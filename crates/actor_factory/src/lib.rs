//! # Actor Factory
//!
//! Camera rig construction on top of the CARLA client.
//!
//! Responsibilities:
//! - Resolve a sector of a `RigConfig` and spawn its color / depth sensors
//! - Wire every sensor callback into the `FrameAssembler`
//! - Tear the rig down and roll clips over
//! - Provide the `CarlaClient` abstraction with a mock implementation
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod capture;
pub mod client;
pub mod error;
pub mod mock_client;
pub mod mock_sensor;
pub mod rig;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;

pub use capture::{capture_callback, ViewCapture};
pub use client::{apply_attributes, CarlaClient, GEOMETRY_ATTRIBUTES};
pub use contracts::{ActorId, SensorHandle, SensorSource};
pub use error::{ActorFactoryError, Result};
pub use mock_client::{MockActor, MockCarlaClient, MockConfig};
pub use mock_sensor::{MockSensor, MockSensorConfig};
pub use rig::{
    default_output_dir, resolve_sector, sensor_attributes, CameraRig, RigSettings,
    RANDOM_SECTOR_ALIASES,
};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::CarlaSensorSource;

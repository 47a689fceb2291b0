//! # Contracts
//!
//! Shared interface contracts for the camera rig capture workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Frame model
//! - Every engine callback carries a `grab_index` (engine frame counter), used as the
//!   pairing and naming key for persisted records
//! - Arrays are stored bottom-up (rows flipped relative to the engine's top-down buffers)

mod error;
mod frame;
mod rig;
mod runtime;
mod sensor;
mod sensor_source;
mod sink;
mod transform;
mod view_name;

pub use error::*;
pub use frame::*;
pub use rig::*;
pub use runtime::*;
pub use sensor::*;
pub use sensor_source::{SensorDataCallback, SensorSource};
pub use sink::*;
pub use transform::*;
pub use view_name::ViewName;

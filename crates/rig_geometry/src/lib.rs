//! # Rig Geometry
//!
//! Pure geometry of a vehicle camera rig.
//!
//! - `Sector`: a cluster of cameras sharing one reference orientation and intrinsics
//! - `View`: one physical camera of a sector and its view-to-main transform
//! - Euler/rotation helpers in the rig-local convention
//! - Conversion of a view pose into the simulator's native transform
//!
//! No I/O and no simulator dependency.

mod pose;
mod rotation;
mod sector;
mod view;

pub use pose::{engine_pose, matrix_from_rows, matrix_to_rows};
pub use rotation::{euler_degrees_from_rotation, rotation_from_euler_degrees};
pub use sector::Sector;
pub use view::View;

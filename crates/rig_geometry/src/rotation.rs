//! Euler angle conversions in the rig-local convention
//!
//! Angles are `[pitch, yaw, roll]` in degrees. Pitch rotates about x, yaw about
//! y and roll about z; the elementary rotations are applied about the fixed
//! axes in x, y, z order, so `R = Rz(roll) * Ry(yaw) * Rx(pitch)`.

use nalgebra::Rotation3;

/// Build a rotation from `[pitch, yaw, roll]` degrees.
///
/// `negate_yaw` flips the yaw sign before composing (rear-mounted cameras).
pub fn rotation_from_euler_degrees(angles: [f64; 3], negate_yaw: bool) -> Rotation3<f64> {
    let [pitch, yaw, roll] = angles;
    let yaw = if negate_yaw { -yaw } else { yaw };
    // nalgebra's (roll, pitch, yaw) are the x, y, z angles of the same extrinsic order
    Rotation3::from_euler_angles(pitch.to_radians(), yaw.to_radians(), roll.to_radians())
}

/// Decompose a rotation back into `[pitch, yaw, roll]` degrees.
pub fn euler_degrees_from_rotation(rotation: &Rotation3<f64>, negate_yaw: bool) -> [f64; 3] {
    let (x, y, z) = rotation.euler_angles();
    let yaw = if negate_yaw { -y } else { y };
    [x.to_degrees(), yaw.to_degrees(), z.to_degrees()]
}

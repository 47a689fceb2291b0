//! View pose → simulator transform
//!
//! The rig-local ("ME") axes are a permutation of the engine axes: the
//! translation column of `pose_view_to_main * reset_matrix` reads `(y, z, x)`
//! in engine terms. Rotation is handed over as the sector's Euler angles
//! directly (not decomposed from the product), with yaw negated for rear views.

use contracts::{Location, Matrix4Rows, Rotation, Transform};
use nalgebra::Matrix4;

use crate::View;

/// Compute the transform of `view` relative to its parent actor.
pub fn engine_pose(view: &View, reset_matrix: &Matrix4<f64>) -> Transform {
    let relative = view.pose_matrix_view_to_main() * reset_matrix;
    let (y, z, x) = (relative[(0, 3)], relative[(1, 3)], relative[(2, 3)]);

    let [pitch, yaw, roll] = view.sector().rotation_to_main();
    let yaw = if view.view_name().is_rear() { -yaw } else { yaw };

    Transform {
        location: Location { x, y, z },
        rotation: Rotation { pitch, yaw, roll },
    }
}

/// Row-major array → matrix
pub fn matrix_from_rows(rows: &Matrix4Rows) -> Matrix4<f64> {
    Matrix4::from_fn(|r, c| rows[r][c])
}

/// Matrix → row-major array
pub fn matrix_to_rows(matrix: &Matrix4<f64>) -> Matrix4Rows {
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = matrix[(r, c)];
        }
    }
    rows
}

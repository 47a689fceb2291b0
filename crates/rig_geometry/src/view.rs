//! View - one physical camera of a sector

use std::sync::Arc;

use contracts::ViewName;
use nalgebra::{Matrix4, Vector3};

use crate::rotation::rotation_from_euler_degrees;
use crate::Sector;

/// A camera inside a sector.
///
/// Holds a shared reference to its sector; views never outlive the session
/// that built the sector.
#[derive(Debug, Clone)]
pub struct View {
    camera_name: String,
    translation_to_main: Vector3<f64>,
    sector: Arc<Sector>,
    view_name: ViewName,
}

impl View {
    pub fn new(camera_name: impl Into<String>, translation: [f64; 3], sector: Arc<Sector>) -> Self {
        let camera_name = camera_name.into();
        let view_name = ViewName::compose(&camera_name, sector.name());
        Self {
            camera_name,
            translation_to_main: Vector3::from(translation),
            sector,
            view_name,
        }
    }

    pub fn camera_name(&self) -> &str {
        &self.camera_name
    }

    pub fn sector(&self) -> &Arc<Sector> {
        &self.sector
    }

    pub fn translation_to_main(&self) -> &Vector3<f64> {
        &self.translation_to_main
    }

    /// `"{camera_name}_to_{sector}"`
    pub fn view_name(&self) -> &ViewName {
        &self.view_name
    }

    /// The view whose camera is named after its sector
    pub fn is_center_view(&self) -> bool {
        self.camera_name == self.sector.name()
    }

    /// Homogeneous view-to-main transform `[[R, T], [0, 1]]`
    ///
    /// `R` comes from the sector's rotation, `T` from this camera's translation.
    pub fn pose_matrix_view_to_main(&self) -> Matrix4<f64> {
        self.pose_matrix(false)
    }

    /// Same as [`View::pose_matrix_view_to_main`] with optional yaw negation
    pub fn pose_matrix(&self, negate_yaw: bool) -> Matrix4<f64> {
        let rotation = rotation_from_euler_degrees(self.sector.rotation_to_main(), negate_yaw);
        let mut pose = rotation.to_homogeneous();
        pose.fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&self.translation_to_main);
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use contracts::SectorSetup;
    use nalgebra::{Matrix3, RowVector4};

    fn sector(name: &str, rotation_to_main: [f64; 3]) -> Arc<Sector> {
        let setup = SectorSetup {
            rotation_to_main,
            origin: [640.0, 360.0],
            width: 1280,
            height: 720,
            focal: 1000.0,
            scale: 1,
            cams: vec![name.into()],
        };
        Arc::new(Sector::new(name, &setup).unwrap())
    }

    #[test]
    fn test_naming_and_center() {
        let main = sector("main", [0.0, 0.0, 0.0]);
        let center = View::new("main", [0.0; 3], main.clone());
        let left = View::new("left", [-0.3, 0.0, 0.0], main);

        assert_eq!(center.view_name(), &ViewName::center("main"));
        assert!(center.is_center_view());
        assert_eq!(left.view_name().as_str(), "left_to_main");
        assert!(!left.is_center_view());
    }

    #[test]
    fn test_pose_layout() {
        let view = View::new("left", [0.5, -0.2, 1.0], sector("main", [0.0, 0.0, 0.0]));
        let pose = view.pose_matrix_view_to_main();

        assert_relative_eq!(
            pose.fixed_view::<3, 3>(0, 0).into_owned(),
            Matrix3::identity()
        );
        assert_relative_eq!(pose[(0, 3)], 0.5);
        assert_relative_eq!(pose[(1, 3)], -0.2);
        assert_relative_eq!(pose[(2, 3)], 1.0);
        assert_eq!(pose.row(3).into_owned(), RowVector4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_pose_is_rigid_for_any_rotation() {
        let steps = [-180.0, -135.0, -90.0, -30.0, 0.0, 45.0, 90.0, 170.0, 180.0];
        for &pitch in &steps {
            for &yaw in &steps {
                for &roll in &steps {
                    let view = View::new(
                        "right",
                        [0.4, 0.1, -0.7],
                        sector("main", [pitch, yaw, roll]),
                    );
                    let pose = view.pose_matrix_view_to_main();
                    let r = pose.fixed_view::<3, 3>(0, 0).into_owned();
                    assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
                    assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
                    assert_eq!(pose.row(3).into_owned(), RowVector4::new(0.0, 0.0, 0.0, 1.0));
                }
            }
        }
    }

    #[test]
    fn test_record_pose_ignores_rear_naming() {
        let rear = sector("rear", [0.0, 30.0, 0.0]);
        let view = View::new("rear", [0.0; 3], rear);
        assert_relative_eq!(view.pose_matrix_view_to_main(), view.pose_matrix(false));
        assert!((view.pose_matrix(true) - view.pose_matrix(false)).abs().max() > 0.1);
    }
}

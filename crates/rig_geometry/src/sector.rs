//! Sector - named cluster of cameras sharing one reference orientation

use contracts::{ContractError, SectorSetup};

/// Immutable sector geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    name: String,
    rotation_to_main: [f64; 3],
    origin: [f64; 2],
    base_width: u32,
    base_height: u32,
    focal_length: f64,
    scale: u32,
}

impl Sector {
    /// Build a sector from its configuration entry.
    ///
    /// # Errors
    /// `ConfigValidation` when `scale < 1` or a dimension / focal length is not positive.
    pub fn new(name: impl Into<String>, setup: &SectorSetup) -> Result<Self, ContractError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ContractError::config_validation(
                "views",
                "sector name cannot be empty",
            ));
        }
        if setup.scale < 1 {
            return Err(ContractError::config_validation(
                format!("views.{name}.scale"),
                format!("scale must be >= 1, got {}", setup.scale),
            ));
        }
        if setup.width == 0 || setup.height == 0 {
            return Err(ContractError::config_validation(
                format!("views.{name}.width/height"),
                format!(
                    "dimensions must be > 0, got {}x{}",
                    setup.width, setup.height
                ),
            ));
        }
        if !(setup.focal.is_finite() && setup.focal > 0.0) {
            return Err(ContractError::config_validation(
                format!("views.{name}.focal"),
                format!("focal must be > 0, got {}", setup.focal),
            ));
        }

        Ok(Self {
            name,
            rotation_to_main: setup.rotation_to_main,
            origin: setup.origin,
            base_width: setup.width,
            base_height: setup.height,
            focal_length: setup.focal,
            scale: setup.scale,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `[pitch, yaw, roll]` degrees, rig-local convention
    pub fn rotation_to_main(&self) -> [f64; 3] {
        self.rotation_to_main
    }

    pub fn origin(&self) -> [f64; 2] {
        self.origin
    }

    pub fn base_width(&self) -> u32 {
        self.base_width
    }

    pub fn base_height(&self) -> u32 {
        self.base_height
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Output image width: `base_width / scale`, rounded down
    pub fn image_width(&self) -> u32 {
        self.base_width / self.scale
    }

    /// Output image height: `base_height / scale`, rounded down
    pub fn image_height(&self) -> u32 {
        self.base_height / self.scale
    }

    /// Horizontal field of view in degrees: `2 * atan(base_width / (2 * focal))`
    ///
    /// The engine derives its focal length from this value and the sensor's
    /// `image_size_x`, so sensors must render at `base_width` for the recorded
    /// `focal_length` to hold.
    pub fn fov_degrees(&self) -> f64 {
        (2.0 * (self.base_width as f64 / (2.0 * self.focal_length)).atan()).to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn setup(width: u32, height: u32, focal: f64, scale: u32) -> SectorSetup {
        SectorSetup {
            rotation_to_main: [0.0, 0.0, 0.0],
            origin: [width as f64 / 2.0, height as f64 / 2.0],
            width,
            height,
            focal,
            scale,
            cams: vec!["main".into()],
        }
    }

    #[test]
    fn test_fov_formula() {
        let sector = Sector::new("main", &setup(1280, 720, 640.0, 1)).unwrap();
        assert_relative_eq!(sector.fov_degrees(), 90.0, epsilon = 1e-12);

        let sector = Sector::new("main", &setup(1920, 1208, 1000.0, 2)).unwrap();
        let expected = 2.0 * (1920.0f64 / 2000.0).atan() * 180.0 / std::f64::consts::PI;
        assert_relative_eq!(sector.fov_degrees(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_image_size_divisible_scale() {
        let sector = Sector::new("main", &setup(1280, 720, 1000.0, 2)).unwrap();
        assert_eq!(sector.image_width(), 640);
        assert_eq!(sector.image_height(), 360);
        assert_eq!(sector.image_width() * sector.scale(), sector.base_width());
    }

    #[test]
    fn test_image_size_non_divisor_floors() {
        let sector = Sector::new("main", &setup(1280, 720, 1000.0, 3)).unwrap();
        assert_eq!(sector.image_width(), 426);
        assert_eq!(sector.image_height(), 240);
        assert_ne!(sector.image_width() * sector.scale(), sector.base_width());
    }

    #[test]
    fn test_rejects_zero_scale() {
        let err = Sector::new("main", &setup(1280, 720, 1000.0, 0)).unwrap_err();
        assert!(err.to_string().contains("scale must be >= 1"), "got: {err}");
    }

    #[test]
    fn test_rejects_non_positive_dimensions() {
        assert!(Sector::new("main", &setup(0, 720, 1000.0, 1)).is_err());
        assert!(Sector::new("main", &setup(1280, 0, 1000.0, 1)).is_err());
        assert!(Sector::new("main", &setup(1280, 720, 0.0, 1)).is_err());
        assert!(Sector::new("main", &setup(1280, 720, -5.0, 1)).is_err());
        assert!(Sector::new("", &setup(1280, 720, 5.0, 1)).is_err());
    }
}

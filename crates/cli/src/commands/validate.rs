//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::RigConfig;
use rig_geometry::Sector;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    car: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    setup_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SetupSummary>,
}

#[derive(Serialize)]
struct SetupSummary {
    sector_count: usize,
    camera_count: usize,
    view_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(
        setup_dir = %args.setup.setup_dir.display(),
        car = %args.setup.car,
        "Validating car setup"
    );

    let result = validate_setup(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Car setup validation failed")
    }
}

fn validate_setup(args: &ValidateArgs) -> ValidationResult {
    let setup_path = config_loader::ConfigLoader::find_car_setup(
        &args.setup.setup_dir,
        &args.setup.car,
    )
    .map(|path| path.display().to_string());

    match super::load_setup(&args.setup) {
        Ok(rig) => {
            let warnings = collect_warnings(&rig);
            ValidationResult {
                valid: true,
                car: args.setup.car.clone(),
                setup_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(SetupSummary {
                    sector_count: rig.views.len(),
                    camera_count: rig.cameras_locations.len(),
                    view_count: rig.views.values().map(|s| s.cams.len()).sum(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            car: args.setup.car.clone(),
            setup_path,
            error: Some(format!("{e:#}")),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect setup warnings (non-fatal issues)
fn collect_warnings(rig: &RigConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for (name, setup) in &rig.views {
        if !setup.has_center_camera(name) {
            warnings.push(format!(
                "Sector '{name}' has no camera named after it - no depth will be recorded"
            ));
        }

        if let Ok(sector) = Sector::new(name, setup) {
            if sector.image_width() * sector.scale() != sector.base_width()
                || sector.image_height() * sector.scale() != sector.base_height()
            {
                warnings.push(format!(
                    "Sector '{name}': {}x{} is not divisible by scale {} - images are stored at {}x{}",
                    setup.width,
                    setup.height,
                    setup.scale,
                    sector.image_width(),
                    sector.image_height()
                ));
            }
        }
    }

    let used: std::collections::BTreeSet<&str> = rig
        .views
        .values()
        .flat_map(|setup| setup.cams.iter().map(String::as_str))
        .collect();
    for camera in rig.cameras_locations.keys() {
        if !used.contains(camera.as_str()) {
            warnings.push(format!("Camera '{camera}' is not part of any sector"));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    let path = result.setup_path.as_deref().unwrap_or("<not found>");
    if result.valid {
        println!("✓ Car setup is valid: {} ({})", result.car, path);

        if let Some(ref summary) = result.summary {
            println!("\n  Sectors: {}", summary.sector_count);
            println!("  Cameras: {}", summary.camera_count);
            println!("  Views: {}", summary.view_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Car setup is invalid: {} ({})", result.car, path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig(json: &str) -> RigConfig {
        config_loader::ConfigLoader::load_from_str(json, config_loader::ConfigFormat::Json)
            .unwrap()
    }

    #[test]
    fn test_warnings_for_odd_scale_and_unused_camera() {
        let rig = rig(r#"{
            "reset_matrix": [[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]],
            "cameras_locations": { "main": [0,0,0], "spare": [1,0,0] },
            "views": {
                "main": {
                    "R_to_main": [0,0,0], "origin": [640,360],
                    "width": 1280, "height": 720, "focal": 1000.0, "scale": 3,
                    "cams": ["main"]
                }
            }
        }"#);

        let warnings = collect_warnings(&rig);
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings[0].contains("stored at 426x240"), "{}", warnings[0]);
        assert!(warnings[1].contains("spare"));
    }
}

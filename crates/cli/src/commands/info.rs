//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RigConfig;
use rig_geometry::{Sector, View};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::cli::InfoArgs;

/// Setup info for JSON output
#[derive(Serialize)]
struct SetupInfo {
    car: String,
    sectors: Vec<SectorInfo>,
}

#[derive(Serialize)]
struct SectorInfo {
    name: String,
    rotation_to_main: [f64; 3],
    focal_length: f64,
    fov_degrees: f64,
    scale: u32,
    image_size: [u32; 2],
    sensor_size: [u32; 2],
    views: Vec<ViewInfo>,
}

#[derive(Serialize)]
struct ViewInfo {
    view_name: String,
    camera: String,
    translation_to_main: [f64; 3],
    center: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(car = %args.setup.car, "Loading car setup info");

    let rig = super::load_setup(&args.setup)?;
    let info = build_setup_info(&args.setup.car, &rig)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize setup info")?;
        println!("{}", json);
    } else {
        print_setup_info(&info);
    }

    Ok(())
}

fn build_setup_info(car: &str, rig: &RigConfig) -> Result<SetupInfo> {
    let mut sectors = Vec::with_capacity(rig.views.len());
    for (name, setup) in &rig.views {
        let sector = Arc::new(Sector::new(name, setup)?);
        let views = setup
            .cams
            .iter()
            .filter_map(|cam| {
                let translation = rig.camera_location(cam)?;
                let view = View::new(cam, translation, sector.clone());
                Some(ViewInfo {
                    view_name: view.view_name().to_string(),
                    camera: cam.clone(),
                    translation_to_main: translation,
                    center: view.is_center_view(),
                })
            })
            .collect();

        sectors.push(SectorInfo {
            name: name.clone(),
            rotation_to_main: sector.rotation_to_main(),
            focal_length: sector.focal_length(),
            fov_degrees: sector.fov_degrees(),
            scale: sector.scale(),
            image_size: [sector.image_width(), sector.image_height()],
            sensor_size: [sector.base_width(), sector.base_height()],
            views,
        });
    }

    Ok(SetupInfo {
        car: car.to_string(),
        sectors,
    })
}

fn print_setup_info(info: &SetupInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Camera Rig Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🚗 Car: {}", info.car);

    println!("\n📷 Sectors ({})", info.sectors.len());
    for (i, sector) in info.sectors.iter().enumerate() {
        let is_last = i == info.sectors.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} (R_to_main {:?}, fov {:.2}°, scale {})",
            prefix, sector.name, sector.rotation_to_main, sector.fov_degrees, sector.scale
        );
        println!(
            "   {}  ├─ image {}x{}, sensor {}x{}",
            child_prefix,
            sector.image_size[0],
            sector.image_size[1],
            sector.sensor_size[0],
            sector.sensor_size[1]
        );
        for (j, view) in sector.views.iter().enumerate() {
            let view_prefix = if j == sector.views.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            let marker = if view.center { " [color+depth]" } else { "" };
            println!(
                "   {}  {} {} {:?}{}",
                child_prefix, view_prefix, view.view_name, view.translation_to_main, marker
            );
        }
    }

    println!();
}

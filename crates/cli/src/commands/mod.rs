//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_capture;
pub use validate::run_validate;

use anyhow::{Context, Result};
use contracts::RigConfig;

use crate::cli::SetupArgs;

/// Load and validate the rig setup named by `args`
fn load_setup(args: &SetupArgs) -> Result<RigConfig> {
    config_loader::ConfigLoader::load_car_setup(&args.setup_dir, &args.car).with_context(|| {
        format!(
            "Failed to load setup of car '{}' from {}",
            args.car,
            args.setup_dir.display()
        )
    })
}

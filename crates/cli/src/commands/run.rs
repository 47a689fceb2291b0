//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_capture(args: &RunArgs) -> Result<()> {
    let rig = super::load_setup(&args.setup)?;

    // The output directory depends on the sector, so resolve it up front
    let sector = actor_factory::resolve_sector(&rig, &args.sector)
        .with_context(|| format!("Failed to resolve sector '{}'", args.sector))?;
    let output_dir = args.output.clone().unwrap_or_else(|| {
        actor_factory::default_output_dir(&args.output_root, &args.setup.car, &sector)
    });
    let first_id = args.id.unwrap_or_else(|| chrono::Utc::now().timestamp());

    info!(
        car = %args.setup.car,
        sector = %sector,
        map = %args.map,
        id = first_id,
        output = %output_dir.display(),
        "Car setup loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let pipeline = Pipeline::new(PipelineConfig {
        rig,
        car_name: args.setup.car.clone(),
        sector,
        map: args.map.clone(),
        first_id,
        output_dir,
        sink_kind: args.sink.into(),
        capture_interval_sec: args.capture_interval,
        max_ticks: (args.ticks != 0).then_some(args.ticks),
        tick_interval: Duration::from_millis(args.tick_ms.max(1)),
        clip_interval: (args.clip_interval != 0)
            .then(|| Duration::from_secs(args.clip_interval)),
        vehicle_blueprint: args.vehicle.clone(),
        host: args.host.clone(),
        port: args.port,
        use_mock: args.mock,
    });

    info!("Starting capture...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Capture failed")?;

    info!(
        ticks = stats.summary.total_ticks,
        persisted = stats.summary.persisted,
        duration_secs = stats.duration.as_secs_f64(),
        records_per_sec = format!("{:.2}", stats.records_per_sec()),
        "Capture completed"
    );
    stats.print_summary();

    info!("Rig Capture finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

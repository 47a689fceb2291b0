//! Capture orchestrator - mounts the rig and drives the tick loop.
//!
//! Supports both real CARLA and mock modes via feature flags.
//! Without `real-carla` (or with `--mock`) the mock client is used and every
//! tick pushes one synthetic frame through all sensors.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actor_factory::{CameraRig, CarlaClient, RigSettings};
use anyhow::{Context, Result};
use contracts::{ActorId, FrameSink, RigConfig};
use dispatcher::SinkKind;
use frame_assembler::FrameAssembler;
use observability::CaptureRunAggregator;
use tracing::{info, warn};

use super::RunStats;

/// Capture configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub rig: RigConfig,
    pub car_name: String,
    /// Already resolved sector name
    pub sector: String,
    pub map: String,
    /// First simulation id suffix
    pub first_id: i64,
    pub output_dir: PathBuf,
    pub sink_kind: SinkKind,
    pub capture_interval_sec: f64,
    /// Ticks to run (None = until shutdown)
    pub max_ticks: Option<u64>,
    pub tick_interval: Duration,
    /// New clip every interval (None = single clip)
    pub clip_interval: Option<Duration>,
    pub vehicle_blueprint: String,
    pub host: String,
    pub port: u16,
    pub use_mock: bool,
}

impl PipelineConfig {
    pub fn simulation_id(&self, id: i64) -> String {
        format!("{}_{}", self.map, id)
    }
}

/// Main capture orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the tick budget is spent or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        #[cfg(feature = "real-carla")]
        if !self.config.use_mock {
            return self.run_real(shutdown).await;
        }

        self.run_mock(shutdown).await
    }

    /// Run with real CARLA server; the engine delivers frames on its own threads
    #[cfg(feature = "real-carla")]
    async fn run_real(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        use actor_factory::RealCarlaClient;

        info!(
            host = %self.config.host,
            port = self.config.port,
            "Connecting to CARLA server..."
        );
        let mut client = RealCarlaClient::new();
        client
            .connect(&self.config.host, self.config.port)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to CARLA at {}:{}",
                    self.config.host, self.config.port
                )
            })?;

        let client = Arc::new(client);
        let assembler = Arc::new(FrameAssembler::new());
        let mut last_persisted = 0;
        let tick_assembler = assembler.clone();

        self.run_with_client(client, assembler, shutdown, move |_| {
            let persisted = tick_assembler.stats().persisted;
            let delta = persisted.saturating_sub(last_persisted);
            last_persisted = persisted;
            std::future::ready(Ok(delta as usize))
        })
        .await
    }

    /// Run with the mock client
    async fn run_mock(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        use actor_factory::MockCarlaClient;

        if !self.config.use_mock {
            warn!("Built without CARLA support, falling back to the mock client");
        }
        info!("Running in MOCK mode (no CARLA server required)");
        let mut client = MockCarlaClient::new();
        client
            .connect(&self.config.host, self.config.port)
            .await
            .context("Failed to initialize mock client")?;

        let client = Arc::new(client);
        let tick_client = client.clone();
        let assembler = Arc::new(FrameAssembler::new());

        self.run_with_client(client, assembler, shutdown, move |grab_index| {
            let client = tick_client.clone();
            async move {
                tokio::task::spawn_blocking(move || client.tick_parallel(grab_index))
                    .await
                    .context("Mock tick task failed")
            }
        })
        .await
    }

    /// Common capture logic shared between mock and real modes
    ///
    /// `tick` advances one frame and reports how many callbacks it observed.
    async fn run_with_client<C, F, Fut>(
        &self,
        client: Arc<C>,
        assembler: Arc<FrameAssembler>,
        shutdown: impl Future<Output = ()>,
        mut tick: F,
    ) -> Result<RunStats>
    where
        C: CarlaClient,
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = Result<usize>>,
    {
        let start_time = Instant::now();
        let config = &self.config;

        let parent = client
            .spawn_vehicle(&config.vehicle_blueprint, None)
            .await
            .context("Failed to spawn vehicle")?;
        info!(actor_id = parent, blueprint = %config.vehicle_blueprint, "Vehicle spawned");

        let sink = dispatcher::create_sink(config.sink_kind, "capture", &config.output_dir)
            .context("Failed to create frame sink")?;
        info!(
            sink = sink.name(),
            output = %config.output_dir.display(),
            "Frame sink ready"
        );

        let mut current_id = config.first_id;
        let mut rig = CameraRig::new(
            client.clone(),
            assembler.clone(),
            sink.clone(),
            RigSettings {
                car_name: config.car_name.clone(),
                simulation_id: config.simulation_id(current_id),
                capture_interval_sec: config.capture_interval_sec,
                parent,
            },
        );

        let mut run = CaptureRunAggregator::new();
        let outcome = async {
            rig.init_sensors(&config.rig, &config.sector)
                .await
                .context("Failed to initialise camera rig")?;
            run.record_clip(rig.simulation_id());
            info!(
                sector = %config.sector,
                sensors = rig.sensors().len(),
                simulation_id = %rig.simulation_id(),
                "Capture running"
            );

            tokio::pin!(shutdown);
            let mut interval = tokio::time::interval(config.tick_interval);
            let mut clip_started = Instant::now();
            let mut grab_index = 0u64;

            loop {
                if config.max_ticks.is_some_and(|max| grab_index >= max) {
                    info!(ticks = grab_index, "Reached tick limit");
                    break;
                }

                tokio::select! {
                    _ = &mut shutdown => {
                        warn!("Received shutdown signal, stopping capture...");
                        break;
                    }
                    _ = interval.tick() => {}
                }

                if config
                    .clip_interval
                    .is_some_and(|every| clip_started.elapsed() >= every)
                {
                    current_id = next_clip_id(current_id, chrono::Utc::now().timestamp());
                    rig.restart_clip(&config.simulation_id(current_id))
                        .await
                        .context("Failed to start new clip")?;
                    run.record_clip(rig.simulation_id());
                    clip_started = Instant::now();
                    info!(simulation_id = %rig.simulation_id(), "New clip started");
                }

                grab_index += 1;
                let tick_start = Instant::now();
                let fired = tick(grab_index).await?;
                run.record_tick(
                    grab_index,
                    fired,
                    tick_start.elapsed().as_secs_f64() * 1000.0,
                );
            }
            anyhow::Ok(())
        }
        .await;

        // Cleanup runs whatever the outcome
        let released = rig.destroy().await;
        self.release_vehicle(client.as_ref(), parent).await;
        if let Err(e) = sink.flush() {
            warn!(error = %e, "Failed to flush frame sink");
        }
        info!(released, "Camera rig released");

        outcome?;

        let assembler_stats = assembler.stats();
        Ok(RunStats {
            summary: run.summary(assembler_stats.persisted, assembler_stats.pending_overwrites),
            duration: start_time.elapsed(),
            output_dir: config.output_dir.clone(),
        })
    }

    async fn release_vehicle<C: CarlaClient>(&self, client: &C, parent: ActorId) {
        if let Err(e) = client.destroy_actor(parent).await {
            warn!(actor_id = parent, error = %e, "Error during vehicle teardown");
        }
    }
}

/// Suffix of the next clip: the current Unix time, strictly increasing
fn next_clip_id(current: i64, now: i64) -> i64 {
    now.max(current + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(output_dir: PathBuf, sink_kind: SinkKind, max_ticks: u64) -> PipelineConfig {
        let rig: RigConfig = serde_json::from_str(
            r#"{
                "reset_matrix": [[1,0,0,0],[0,1,0,1.5],[0,0,1,0.25],[0,0,0,1]],
                "cameras_locations": { "main": [0,0,0], "left": [-0.5,0,0] },
                "views": {
                    "main": {
                        "R_to_main": [0,0,0], "origin": [4,2],
                        "width": 8, "height": 4, "focal": 4.0, "scale": 2,
                        "cams": ["main", "left"]
                    }
                }
            }"#,
        )
        .unwrap();

        PipelineConfig {
            rig,
            car_name: "sedan".into(),
            sector: "main".into(),
            map: "Town01".into(),
            first_id: 7,
            output_dir,
            sink_kind,
            capture_interval_sec: 0.1,
            max_ticks: Some(max_ticks),
            tick_interval: Duration::from_millis(1),
            clip_interval: None,
            vehicle_blueprint: "vehicle.tesla.model3".into(),
            host: "127.0.0.1".into(),
            port: 2000,
            use_mock: true,
        }
    }

    #[test]
    fn test_next_clip_id_is_monotonic() {
        assert_eq!(next_clip_id(100, 250), 250);
        assert_eq!(next_clip_id(250, 250), 251);
        assert_eq!(next_clip_id(300, 250), 301);
    }

    #[tokio::test]
    async fn test_mock_run_writes_archives() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(dir.path().to_path_buf(), SinkKind::Npz, 4));

        let stats = pipeline.run(std::future::pending()).await.unwrap();

        assert_eq!(stats.summary.total_ticks, 4);
        assert_eq!(stats.summary.total_callbacks, 12);
        assert_eq!(stats.summary.persisted, 8);

        for view in ["main_to_main", "left_to_main"] {
            let files = std::fs::read_dir(dir.path().join("Town01_7").join(view))
                .unwrap()
                .count();
            assert_eq!(files, 4, "{view}");
        }
        assert!(dir
            .path()
            .join("Town01_7/left_to_main/Town01_7_left_to_main_0000003.npz")
            .is_file());
    }

    #[tokio::test]
    async fn test_shutdown_stops_run_and_releases_rig() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path().to_path_buf(), SinkKind::Log, 0);
        config.max_ticks = None;

        let stats = Pipeline::new(config)
            .run(tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap();

        assert_eq!(stats.summary.clips, 1);
        assert_eq!(
            stats.summary.persisted,
            stats.summary.total_ticks * 2,
            "{}",
            stats.summary
        );
    }
}

//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 装配文件快照测试
//! - 模拟 e2e 测试（无需 CARLA）

#[cfg(test)]
mod setup_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    use super::fixtures::SETUP_JSON;

    #[test]
    fn test_setup_file_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let rig = ConfigLoader::load_from_str(SETUP_JSON, ConfigFormat::Json).unwrap();

        let toml = ConfigLoader::to_toml(&rig).unwrap();
        std::fs::write(dir.path().join("sedan.toml"), toml).unwrap();

        let loaded = ConfigLoader::load_car_setup(dir.path(), "sedan").unwrap();
        assert_eq!(loaded.views, rig.views);
        assert_eq!(loaded.cameras_locations, rig.cameras_locations);
        assert_eq!(loaded.reset_matrix, rig.reset_matrix);
    }

    #[test]
    fn test_shipped_car_setup_is_valid() {
        let setup_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../car_setups");
        let rig = ConfigLoader::load_car_setup(&setup_dir, "Alfred").unwrap();

        assert_eq!(rig.sector_names(), vec!["main", "rear"]);
        for (name, setup) in &rig.views {
            assert!(setup.has_center_camera(name), "{name}");
            let sector = rig_geometry::Sector::new(name, setup).unwrap();
            assert_eq!(sector.image_width() * sector.scale(), sector.base_width());
        }
    }

    #[test]
    fn test_missing_setup_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_car_setup(dir.path(), "ghost").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ghost"));
    }
}

#[cfg(test)]
mod fixtures {
    use std::sync::{Arc, Mutex};

    use actor_factory::{CameraRig, CarlaClient, MockCarlaClient, RigSettings};
    use contracts::{CapturedFrame, ContractError, FrameSink, RigConfig, ViewName};
    use frame_assembler::FrameAssembler;

    /// Two sectors: `main` (main + left) and `rear`
    pub const SETUP_JSON: &str = r#"{
        "reset_matrix": [[1,0,0,0],[0,1,0,1.5],[0,0,1,0.25],[0,0,0,1]],
        "cameras_locations": {
            "main": [0, 0, 0],
            "left": [-0.5, 0, 0.2],
            "rear": [0, 0, -2.0]
        },
        "views": {
            "main": {
                "R_to_main": [0, 0, 0], "origin": [8, 4],
                "width": 16, "height": 8, "focal": 8.0, "scale": 2,
                "cams": ["main", "left"]
            },
            "rear": {
                "R_to_main": [0, 180, 0], "origin": [8, 4],
                "width": 16, "height": 8, "focal": 8.0, "scale": 2,
                "cams": ["rear"]
            }
        }
    }"#;

    pub fn rig_config() -> RigConfig {
        config_loader::ConfigLoader::load_from_str(SETUP_JSON, config_loader::ConfigFormat::Json)
            .unwrap()
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub records: Mutex<Vec<(ViewName, CapturedFrame)>>,
    }

    impl RecordingSink {
        pub fn count(&self, view: &str) -> usize {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter(|(v, _)| v.as_str() == view)
                .count()
        }
    }

    impl FrameSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn write(&self, view: &ViewName, frame: &CapturedFrame) -> Result<(), ContractError> {
            self.records.lock().unwrap().push((view.clone(), frame.clone()));
            Ok(())
        }
    }

    pub async fn mock_rig(
        sink: Arc<dyn FrameSink>,
        simulation_id: &str,
    ) -> (
        Arc<MockCarlaClient>,
        Arc<FrameAssembler>,
        CameraRig<MockCarlaClient>,
    ) {
        let mut client = MockCarlaClient::new();
        client.connect("127.0.0.1", 2000).await.unwrap();
        let parent = client
            .spawn_vehicle("vehicle.tesla.model3", None)
            .await
            .unwrap();

        let client = Arc::new(client);
        let assembler = Arc::new(FrameAssembler::new());
        let rig = CameraRig::new(
            client.clone(),
            assembler.clone(),
            sink,
            RigSettings {
                car_name: "sedan".into(),
                simulation_id: simulation_id.into(),
                capture_interval_sec: 0.05,
                parent,
            },
        );
        (client, assembler, rig)
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Read;
    use std::path::Path;
    use std::sync::Arc;

    use dispatcher::NpzSink;

    use super::fixtures::{mock_rig, rig_config, RecordingSink};

    fn archive_members(path: &Path) -> Vec<String> {
        let file = std::fs::File::open(path).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    fn read_member(path: &Path, member: &str) -> Vec<u8> {
        let file = std::fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut bytes = Vec::new();
        archive
            .by_name(member)
            .unwrap()
            .read_to_end(&mut bytes)
            .unwrap();
        bytes
    }

    /// End-to-end: CameraRig -> mock ticks -> FrameAssembler -> NpzSink
    ///
    /// 验证完整的数据流：
    /// 1. 扇区 main 生成 3 个传感器 (main 彩色 + 深度, left 彩色)
    /// 2. 10 个 tick 产生 10 条合并的 main_to_main 记录和 10 条 left_to_main 记录
    /// 3. 归档的成员与命名符合约定
    #[tokio::test]
    async fn test_e2e_mock_capture_to_npz() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(NpzSink::new("npz", dir.path()).unwrap());
        let (client, assembler, mut rig) = mock_rig(sink.clone(), "Town01_42").await;

        rig.init_sensors(&rig_config(), "main").await.unwrap();
        assert_eq!(rig.sensors().len(), 3);

        for frame in 1..=10 {
            assert_eq!(client.tick(frame), 3);
        }

        let stats = assembler.stats();
        assert_eq!(stats.persisted, 20);
        assert_eq!(stats.pending_halves, 0);
        assert_eq!(stats.pending_overwrites, 0);

        for view in ["main_to_main", "left_to_main"] {
            let count = std::fs::read_dir(dir.path().join("Town01_42").join(view))
                .unwrap()
                .count();
            assert_eq!(count, 10, "{view}");
        }

        let center = dir
            .path()
            .join("Town01_42/main_to_main/Town01_42_main_to_main_0000007.npz");
        assert_eq!(
            archive_members(&center),
            vec![
                "RT_view_to_main.npy",
                "clip_name.npy",
                "focal.npy",
                "fov.npy",
                "grab_index.npy",
                "image.npy",
                "origin.npy",
                "sim_depth.npy",
            ]
        );

        let side = dir
            .path()
            .join("Town01_42/left_to_main/Town01_42_left_to_main_0000007.npz");
        let members = archive_members(&side);
        assert!(members.contains(&"image.npy".to_string()));
        assert!(!members.contains(&"sim_depth.npy".to_string()));

        let image = read_member(&side, "image.npy");
        assert_eq!(&image[..6], b"\x93NUMPY");
        let header = String::from_utf8_lossy(&image[10..]);
        assert!(header.contains("'descr': '|u1'"), "{header}");
        assert!(header.contains("'shape': (4, 8)"), "{header}");

        assert_eq!(rig.destroy().await, 3);
        assert_eq!(sink.metrics().failure_count(), 0);
        assert_eq!(sink.metrics().write_count(), 20);
    }

    /// 彩色与深度回调在不同线程上并发到达时，每个 tick 恰好一条合并记录
    #[tokio::test]
    async fn test_parallel_delivery_merges_once_per_tick() {
        let sink = Arc::new(RecordingSink::default());
        let (client, assembler, mut rig) = mock_rig(sink.clone(), "Town01_1").await;
        rig.init_sensors(&rig_config(), "main").await.unwrap();

        for frame in 1..=200 {
            assert_eq!(client.tick_parallel(frame), 3);
        }

        assert_eq!(sink.count("main_to_main"), 200);
        assert_eq!(sink.count("left_to_main"), 200);
        assert!(sink
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(view, _)| view.as_str() == "main_to_main")
            .all(|(_, frame)| frame.is_complete()));
        assert_eq!(assembler.stats().pending_overwrites, 0);
    }

    /// 缩放不能整除尺寸时：传感器按原始尺寸渲染，引擎焦距与记录一致，图像向下取整
    #[tokio::test]
    async fn test_non_divisible_scale_keeps_recorded_focal() {
        let mut config = rig_config();
        let main = config.views.get_mut("main").unwrap();
        main.width = 15;
        main.height = 7;
        main.focal = 6.0;

        let sink = Arc::new(RecordingSink::default());
        let (client, _assembler, mut rig) = mock_rig(sink.clone(), "Town01_5").await;
        rig.init_sensors(&config, "main").await.unwrap();

        for (_, actor) in client.sensor_actors() {
            assert_eq!(actor.attributes["image_size_x"], "15");
            assert_eq!(actor.attributes["image_size_y"], "7");
            let fov: f64 = actor.attributes["fov"].parse().unwrap();
            let engine_focal = 15.0 / (2.0 * (fov.to_radians() / 2.0).tan());
            assert!((engine_focal - 6.0).abs() < 1e-9, "{engine_focal}");
        }

        assert_eq!(client.tick(1), 3);
        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        for (_, frame) in records.iter() {
            assert_eq!(frame.focal_length, 6.0);
            assert_eq!(frame.image.as_ref().unwrap().dim(), (3, 7));
        }
        let (_, center) = records
            .iter()
            .find(|(view, _)| view.as_str() == "main_to_main")
            .unwrap();
        assert_eq!(center.depth_map.as_ref().unwrap().dim(), (3, 7));
    }

    /// 切换 clip 后记录写入新的 simulation id 目录
    #[tokio::test]
    async fn test_clip_rollover_splits_output() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(NpzSink::new("npz", dir.path()).unwrap());
        let (client, _assembler, mut rig) = mock_rig(sink, "Town01_1").await;

        rig.init_sensors(&rig_config(), "main").await.unwrap();
        for frame in 1..=3 {
            client.tick(frame);
        }
        rig.restart_clip("Town01_2").await.unwrap();
        for frame in 4..=5 {
            client.tick(frame);
        }
        rig.destroy().await;

        let count = |clip: &str| {
            std::fs::read_dir(dir.path().join(clip).join("left_to_main"))
                .unwrap()
                .count()
        };
        assert_eq!(count("Town01_1"), 3);
        assert_eq!(count("Town01_2"), 2);
        assert!(dir
            .path()
            .join("Town01_2/main_to_main/Town01_2_main_to_main_0000004.npz")
            .is_file());
    }

    /// 销毁后不再有回调，仅父车辆保留
    #[tokio::test]
    async fn test_destroy_releases_every_sensor() {
        let sink = Arc::new(RecordingSink::default());
        let (client, assembler, mut rig) = mock_rig(sink.clone(), "Town01_1").await;
        rig.init_sensors(&rig_config(), "rear").await.unwrap();
        client.tick(1);

        assert_eq!(rig.destroy().await, 2);
        assert_eq!(client.actor_count(), 1);
        assert_eq!(client.tick(2), 0);
        assert_eq!(assembler.stats().open_sessions, 0);
        assert_eq!(sink.count("rear_to_rear"), 1);
    }

    /// 随机扇区：输出目录跟随解析出的扇区
    #[tokio::test]
    async fn test_random_sector_output_dir() {
        let rig_config = rig_config();
        let sector = actor_factory::resolve_sector(&rig_config, "random").unwrap();
        let root = tempfile::tempdir().unwrap();
        let out = actor_factory::default_output_dir(root.path(), "sedan", &sector);

        let sink = Arc::new(NpzSink::new("npz", &out).unwrap());
        let (client, _assembler, mut rig) = mock_rig(sink, "Town03_9").await;
        rig.init_sensors(&rig_config, &sector).await.unwrap();
        client.tick(1);
        rig.destroy().await;

        let center = format!("{sector}_to_{sector}");
        assert!(out
            .join("Town03_9")
            .join(&center)
            .join(format!("Town03_9_{center}_0000001.npz"))
            .is_file());
    }
}

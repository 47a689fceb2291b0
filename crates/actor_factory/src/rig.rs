//! CameraRig 核心实现
//!
//! 从 `RigConfig` 的一个扇区生成相机传感器，把每个传感器接到帧组装器上，
//! 并负责销毁与切换 clip。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contracts::{
    ActorId, ContractError, FrameSink, RigConfig, SensorHandle, SensorKind, SensorSource,
};
use frame_assembler::{FrameAssembler, SessionConfig, SessionId};
use nalgebra::Matrix4;
use rand::seq::IndexedRandom;
use rig_geometry::{engine_pose, matrix_from_rows, Sector, View};
use tracing::{error, info, instrument, warn};

use crate::capture::{capture_callback, ViewCapture};
use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};

/// 请求随机扇区时可用的名字
pub const RANDOM_SECTOR_ALIASES: [&str; 2] = ["random", "rand"];

/// 与扇区无关的 rig 参数
#[derive(Debug, Clone, PartialEq)]
pub struct RigSettings {
    pub car_name: String,
    /// clip 标识，写入每条记录并作为输出子目录
    pub simulation_id: String,
    /// 传感器 `sensor_tick` (秒)
    pub capture_interval_sec: f64,
    /// 传感器挂载的父 actor
    pub parent: ActorId,
}

struct SpawnedSensor {
    handle: SensorHandle,
    source: Box<dyn SensorSource>,
}

struct RigState {
    config: RigConfig,
    sector: Arc<Sector>,
    views: Vec<View>,
    sensors: Vec<SpawnedSensor>,
    session: SessionId,
}

/// 一辆车上一个扇区的相机组
///
/// 每个 view 一个彩色相机，中心 view 额外一个深度相机。
pub struct CameraRig<C: CarlaClient> {
    client: Arc<C>,
    assembler: Arc<FrameAssembler>,
    sink: Arc<dyn FrameSink>,
    settings: RigSettings,
    state: Option<RigState>,
}

impl<C: CarlaClient> CameraRig<C> {
    pub fn new(
        client: Arc<C>,
        assembler: Arc<FrameAssembler>,
        sink: Arc<dyn FrameSink>,
        settings: RigSettings,
    ) -> Self {
        Self {
            client,
            assembler,
            sink,
            settings,
            state: None,
        }
    }

    /// 为 `sector_name` 生成全部传感器并开始采集
    ///
    /// `"random"` / `"rand"` 随机选择一个扇区。已初始化的 rig 会先被销毁。
    ///
    /// # 失败
    /// 传感器 spawn 失败时返回错误，已生成的传感器保留在 rig 中，
    /// 由 [`CameraRig::destroy`] 释放。
    #[instrument(
        name = "camera_rig_init_sensors",
        skip(self, rig),
        fields(car = %self.settings.car_name, simulation_id = %self.settings.simulation_id)
    )]
    pub async fn init_sensors(&mut self, rig: &RigConfig, sector_name: &str) -> Result<()> {
        if self.state.is_some() {
            self.destroy().await;
        }

        let sector_name = resolve_sector(rig, sector_name)?;
        let setup = rig.sector(&sector_name).ok_or_else(|| {
            ContractError::config_validation("sector", format!("unknown sector '{sector_name}'"))
        })?;
        let sector = Arc::new(Sector::new(&sector_name, setup)?);
        let views = setup
            .cams
            .iter()
            .map(|cam| -> Result<View> {
                let translation = rig.camera_location(cam).ok_or_else(|| {
                    ContractError::config_validation(
                        format!("views.{sector_name}.cams"),
                        format!("camera '{cam}' has no entry in cameras_locations"),
                    )
                })?;
                Ok(View::new(cam, translation, sector.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let session = self.assembler.open_session(SessionConfig::new(
            &self.settings.car_name,
            &sector_name,
            &self.settings.simulation_id,
            self.sink.clone(),
        ));
        self.state = Some(RigState {
            config: rig.clone(),
            sector: sector.clone(),
            views: views.clone(),
            sensors: Vec::with_capacity(views.len() + 1),
            session,
        });

        let reset = matrix_from_rows(&rig.reset_matrix);
        let attributes = sensor_attributes(&sector, self.settings.capture_interval_sec);

        for view in &views {
            let kinds: &[SensorKind] = if view.is_center_view() {
                &[SensorKind::Color, SensorKind::Depth]
            } else {
                &[SensorKind::Color]
            };
            for &kind in kinds {
                self.spawn_sensor(view, kind, &reset, &attributes, session)
                    .await?;
            }
        }

        info!(
            sector = %sector_name,
            views = views.len(),
            sensors = self.sensors().len(),
            image_width = sector.image_width(),
            image_height = sector.image_height(),
            fov = sector.fov_degrees(),
            "camera rig initialised"
        );
        Ok(())
    }

    #[instrument(
        name = "camera_rig_spawn_sensor",
        skip(self, view, kind, reset, attributes, session),
        fields(view = %view.view_name(), kind = %kind)
    )]
    async fn spawn_sensor(
        &mut self,
        view: &View,
        kind: SensorKind,
        reset: &Matrix4<f64>,
        attributes: &HashMap<String, String>,
        session: SessionId,
    ) -> Result<()> {
        let transform = engine_pose(view, reset);
        let label = format!("{}/{}", view.view_name(), kind);
        let parent = self.settings.parent;

        let actor_id = self
            .client
            .spawn_sensor(kind.blueprint(), transform, parent, attributes)
            .await
            .map_err(|e| {
                ActorFactoryError::sensor_spawn(&label, format!("actor_{parent}"), e.to_string())
            })?;

        let handle = SensorHandle {
            view: view.view_name().clone(),
            kind,
            actor_id,
        };
        let Some(source) = self
            .client
            .get_sensor_source(actor_id, handle.label(), kind)
        else {
            if let Err(e) = self.client.destroy_actor(actor_id).await {
                warn!(actor_id, error = %e, "failed to release sensor without data source");
            }
            return Err(ActorFactoryError::SourceUnavailable {
                sensor_id: label,
                actor_id,
            });
        };

        source.listen(capture_callback(
            self.assembler.clone(),
            session,
            ViewCapture::new(view, kind, &self.settings.simulation_id),
        ));
        metrics::counter!("rig_capture_sensors_spawned_total", "kind" => kind.to_string())
            .increment(1);
        info!(actor_id, "sensor spawned and listening");

        if let Some(state) = self.state.as_mut() {
            state.sensors.push(SpawnedSensor { handle, source });
        }
        Ok(())
    }

    /// 停止并销毁全部传感器，关闭组装会话
    ///
    /// 幂等；返回成功销毁的传感器数量。
    #[instrument(
        name = "camera_rig_destroy",
        skip(self),
        fields(car = %self.settings.car_name)
    )]
    pub async fn destroy(&mut self) -> usize {
        let Some(state) = self.state.take() else {
            return 0;
        };

        let mut released = 0;
        for sensor in state.sensors {
            sensor.source.stop();
            let actor_id = sensor.handle.actor_id;
            match self.client.destroy_actor(actor_id).await {
                Ok(()) => released += 1,
                Err(e) => error!(
                    actor_id,
                    sensor = %sensor.handle.label(),
                    error = %e,
                    "failed to destroy sensor"
                ),
            }
        }
        self.assembler.close_session(state.session);

        info!(sector = %state.sector.name(), released, "camera rig destroyed");
        released
    }

    /// 以新的 simulation id 重新初始化当前扇区
    ///
    /// 需要一个已初始化的 rig。
    #[instrument(name = "camera_rig_restart_clip", skip(self))]
    pub async fn restart_clip(&mut self, simulation_id: &str) -> Result<()> {
        let (config, sector_name) = match &self.state {
            Some(state) => (state.config.clone(), state.sector.name().to_string()),
            None => return Err(ActorFactoryError::RigNotInitialized),
        };

        self.destroy().await;
        self.settings.simulation_id = simulation_id.to_string();
        self.init_sensors(&config, &sector_name).await
    }

    /// 当前传感器句柄，按 spawn 顺序
    pub fn sensors(&self) -> Vec<&SensorHandle> {
        self.state
            .iter()
            .flat_map(|state| state.sensors.iter().map(|s| &s.handle))
            .collect()
    }

    pub fn views(&self) -> &[View] {
        self.state
            .as_ref()
            .map_or(&[][..], |state| state.views.as_slice())
    }

    pub fn sector(&self) -> Option<&Arc<Sector>> {
        self.state.as_ref().map(|state| &state.sector)
    }

    pub fn session(&self) -> Option<SessionId> {
        self.state.as_ref().map(|state| state.session)
    }

    pub fn settings(&self) -> &RigSettings {
        &self.settings
    }

    pub fn simulation_id(&self) -> &str {
        &self.settings.simulation_id
    }

    pub fn is_initialised(&self) -> bool {
        self.state.is_some()
    }
}

/// 把请求的扇区名解析为配置中存在的扇区
///
/// 随机选择使用非确定种子，每次运行结果可能不同。
pub fn resolve_sector(rig: &RigConfig, requested: &str) -> Result<String> {
    let names = rig.sector_names();

    if RANDOM_SECTOR_ALIASES.contains(&requested) {
        let chosen = names.choose(&mut rand::rng()).ok_or_else(|| {
            ContractError::config_validation("views", "no sectors to choose from")
        })?;
        info!(sector = %chosen, "randomly selected sector");
        return Ok(chosen.to_string());
    }

    if rig.sector(requested).is_none() {
        return Err(ContractError::config_validation(
            "sector",
            format!(
                "unknown sector '{requested}', available: {}",
                names.join(", ")
            ),
        )
        .into());
    }
    Ok(requested.to_string())
}

/// `{output_root}/{car_name}/{sector}`
pub fn default_output_dir(output_root: &Path, car_name: &str, sector: &str) -> PathBuf {
    output_root.join(car_name).join(sector)
}

/// 同一扇区内所有相机共用的蓝图属性
///
/// 传感器以原始分辨率渲染，`fov` 与 `image_size_x` 来自同一宽度，
/// 引擎反推的焦距即记录中的 `focal`；缩放由解码端完成。
pub fn sensor_attributes(sector: &Sector, capture_interval_sec: f64) -> HashMap<String, String> {
    HashMap::from([
        ("image_size_x".to_string(), sector.base_width().to_string()),
        ("image_size_y".to_string(), sector.base_height().to_string()),
        ("fov".to_string(), sector.fov_degrees().to_string()),
        ("sensor_tick".to_string(), capture_interval_sec.to_string()),
    ])
}

//! Mock CARLA 客户端
//!
//! 用于单元测试与无 CARLA 环境运行的 mock 实现，支持注入失败场景，
//! 并通过 `tick` 驱动已监听的 mock 相机。

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{ActorId, SensorKind, SensorSource, Transform};
use tracing::{instrument, trace};

use crate::client::{apply_attributes, CarlaClient};
use crate::error::{ActorFactoryError, Result};
use crate::mock_sensor::{MockSensor, MockSensorConfig};

/// Mock 客户端配置
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// 应该失败的 vehicle blueprints
    pub fail_vehicles: Vec<String>,
    /// 应该失败的 sensor blueprints
    pub fail_sensor_blueprints: Vec<String>,
    /// 成功 spawn 这么多个 sensor 之后，后续 sensor spawn 全部失败
    pub fail_sensors_after: Option<usize>,
    /// 应该失败的 destroy actor IDs
    pub fail_destroy: Vec<ActorId>,
    /// 蓝图拒绝设置的属性名
    pub rejected_attributes: Vec<String>,
}

/// Mock 中记录的 actor
#[derive(Debug, Clone, PartialEq)]
pub struct MockActor {
    pub blueprint: String,
    pub parent: Option<ActorId>,
    pub transform: Option<Transform>,
    pub attributes: HashMap<String, String>,
}

/// Mock CARLA 客户端
pub struct MockCarlaClient {
    /// 配置（可注入失败场景）
    config: MockConfig,
    /// Actor ID 计数器
    next_actor_id: AtomicU32,
    /// 成功 spawn 的 sensor 数
    sensors_spawned: AtomicUsize,
    /// 已创建的 actors
    actors: Mutex<HashMap<ActorId, MockActor>>,
    /// 已交出的相机 (actor_id -> 共享状态的副本)
    sensors: Mutex<BTreeMap<ActorId, MockSensor>>,
    /// 连接状态
    connected: Mutex<bool>,
}

impl MockCarlaClient {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 客户端
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            next_actor_id: AtomicU32::new(1000), // 从 1000 开始，便于识别
            sensors_spawned: AtomicUsize::new(0),
            actors: Mutex::new(HashMap::new()),
            sensors: Mutex::new(BTreeMap::new()),
            connected: Mutex::new(false),
        }
    }

    /// 获取当前已创建的 actor 数量
    pub fn actor_count(&self) -> usize {
        self.actors().len()
    }

    /// 获取所有已创建的 actor IDs
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        self.actors().keys().copied().collect()
    }

    /// 查询 actor 的 spawn 参数
    pub fn actor(&self, actor_id: ActorId) -> Option<MockActor> {
        self.actors().get(&actor_id).cloned()
    }

    /// 当前存活的 sensor actors (按 actor ID 排序)
    pub fn sensor_actors(&self) -> Vec<(ActorId, MockActor)> {
        let mut sensors: Vec<_> = self
            .actors()
            .iter()
            .filter(|(_, actor)| actor.parent.is_some())
            .map(|(id, actor)| (*id, actor.clone()))
            .collect();
        sensors.sort_by_key(|(id, _)| *id);
        sensors
    }

    /// 正在监听的 mock 相机数量
    pub fn listening_count(&self) -> usize {
        self.sensor_map()
            .values()
            .filter(|sensor| sensor.is_listening())
            .count()
    }

    /// 模拟一次引擎 tick：在当前线程依次触发所有监听中的相机
    ///
    /// 返回触发的回调数量。
    #[instrument(name = "mock_carla_tick", level = "trace", skip(self))]
    pub fn tick(&self, frame: u64) -> usize {
        let sensors: Vec<MockSensor> = self.sensor_map().values().cloned().collect();
        sensors
            .iter()
            .filter(|sensor| sensor.emit(sensor.generate_image(frame)))
            .count()
    }

    /// 同 [`MockCarlaClient::tick`]，但每个相机在独立线程上回调
    ///
    /// 模拟引擎在多个线程上并发交付同一帧的情况。
    #[instrument(name = "mock_carla_tick_parallel", level = "trace", skip(self))]
    pub fn tick_parallel(&self, frame: u64) -> usize {
        let sensors: Vec<MockSensor> = self.sensor_map().values().cloned().collect();
        let fired = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for sensor in &sensors {
                let fired = &fired;
                scope.spawn(move || {
                    if sensor.emit(sensor.generate_image(frame)) {
                        fired.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });
        fired.into_inner()
    }

    fn actors(&self) -> MutexGuard<'_, HashMap<ActorId, MockActor>> {
        self.actors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sensor_map(&self) -> MutexGuard<'_, BTreeMap<ActorId, MockSensor>> {
        self.sensors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    fn should_fail_sensor(&self, blueprint: &str) -> bool {
        if self.config.fail_sensor_blueprints.iter().any(|b| b == blueprint) {
            return true;
        }
        self.config
            .fail_sensors_after
            .is_some_and(|limit| self.sensors_spawned.load(Ordering::SeqCst) >= limit)
    }

    fn ensure_connected(&self) -> Result<()> {
        if *self.connected.lock().unwrap_or_else(PoisonError::into_inner) {
            Ok(())
        } else {
            Err(ActorFactoryError::ConnectionFailed {
                message: "not connected".into(),
            })
        }
    }

    fn sensor_config(actor: &MockActor) -> MockSensorConfig {
        let defaults = MockSensorConfig::default();
        let attr = |key: &str| actor.attributes.get(key).and_then(|v| v.parse().ok());
        MockSensorConfig {
            width: attr("image_size_x").unwrap_or(defaults.width),
            height: attr("image_size_y").unwrap_or(defaults.height),
            sensor_tick: actor
                .attributes
                .get("sensor_tick")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sensor_tick),
            ..defaults
        }
    }
}

impl Default for MockCarlaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CarlaClient for MockCarlaClient {
    #[instrument(name = "mock_carla_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let _ = (host, port);
        *self.connected.lock().unwrap_or_else(PoisonError::into_inner) = true;
        Ok(())
    }

    #[instrument(
        name = "mock_carla_spawn_vehicle",
        skip(self, transform),
        fields(blueprint = %blueprint, has_transform = transform.is_some())
    )]
    async fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Option<Transform>,
    ) -> Result<ActorId> {
        self.ensure_connected()?;

        if self.config.fail_vehicles.iter().any(|b| b == blueprint) {
            return Err(ActorFactoryError::vehicle_spawn(blueprint, "mock failure"));
        }

        let actor_id = self.allocate_actor_id();
        self.actors().insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                parent: None,
                transform,
                attributes: HashMap::new(),
            },
        );
        Ok(actor_id)
    }

    #[instrument(
        name = "mock_carla_spawn_sensor",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        self.ensure_connected()?;

        // 验证 parent 存在
        if !self.actors().contains_key(&parent_id) {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                format!("actor_{parent_id}"),
                "parent actor not found",
            ));
        }

        if self.should_fail_sensor(blueprint) {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                format!("actor_{parent_id}"),
                "mock failure",
            ));
        }

        let mut applied = HashMap::with_capacity(attributes.len());
        apply_attributes(attributes, |key, value| {
            if self.config.rejected_attributes.iter().any(|k| k == key) {
                return false;
            }
            applied.insert(key.to_string(), value.to_string());
            true
        })
        .map_err(|message| {
            ActorFactoryError::sensor_spawn(blueprint, format!("actor_{parent_id}"), message)
        })?;

        let actor_id = self.allocate_actor_id();
        self.actors().insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                parent: Some(parent_id),
                transform: Some(transform),
                attributes: applied,
            },
        );
        self.sensors_spawned.fetch_add(1, Ordering::SeqCst);
        Ok(actor_id)
    }

    #[instrument(name = "mock_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if self.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        // 幂等：即使不存在也返回 Ok
        self.actors().remove(&actor_id);
        if let Some(sensor) = self.sensor_map().remove(&actor_id) {
            sensor.stop();
        }
        Ok(())
    }

    #[instrument(name = "mock_carla_actor_exists", skip(self), fields(actor_id))]
    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.actors().contains_key(&actor_id))
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        label: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>> {
        let actor = self.actor(actor_id)?;
        actor.parent?;

        let sensor = self
            .sensor_map()
            .entry(actor_id)
            .or_insert_with(|| MockSensor::new(label, kind, Self::sensor_config(&actor)))
            .clone();
        trace!(actor_id, sensor = sensor.sensor_id(), "mock sensor source handed out");
        Some(Box::new(sensor))
    }
}

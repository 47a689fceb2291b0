//! 真实 CARLA 客户端
//!
//! 基于 carla-rust 连接 CARLA 服务器：生成自动驾驶的载具，
//! 将相机按引擎坐标挂载到载具上，并登记所有 actor 以便拆除。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use carla::client::{ActorBase, Client, Sensor, Vehicle, World};
use carla::geom::{Location, Rotation, Transform as CarlaTransform};
use contracts::{ActorId, SensorKind, SensorSource, Transform};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::CarlaSensorSource;
use crate::client::{apply_attributes, CarlaClient};
use crate::error::{ActorFactoryError, Result};

/// 已生成的 actor
#[derive(Clone)]
enum SpawnedActor {
    Vehicle(Vehicle),
    Camera(Sensor),
}

/// 真实 CARLA 客户端
///
/// `&self` 方法通过互斥锁访问 World，多个相机回调线程可共享同一客户端。
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    client: Arc<Mutex<Option<Client>>>,
    world: Arc<Mutex<Option<World>>>,
    /// 生成过的 actor，destroy 时按 ID 取出
    actors: Arc<Mutex<HashMap<ActorId, SpawnedActor>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn parent_name(parent_id: ActorId) -> String {
    format!("actor_{parent_id}")
}

fn engine_transform(transform: &Transform) -> CarlaTransform {
    CarlaTransform {
        location: Location {
            x: transform.location.x as f32,
            y: transform.location.y as f32,
            z: transform.location.z as f32,
        },
        rotation: Rotation {
            pitch: transform.rotation.pitch as f32,
            yaw: transform.rotation.yaw as f32,
            roll: transform.rotation.roll as f32,
        },
    }
}

impl RealCarlaClient {
    /// 未连接状态的客户端
    pub fn new() -> Self {
        Self::default()
    }

    fn with_world<R>(&self, f: impl FnOnce(&mut World) -> Result<R>) -> Result<R> {
        let mut guard = lock(&self.world);
        let world = guard.as_mut().ok_or_else(|| ActorFactoryError::ConnectionFailed {
            message: "not connected to CARLA server".into(),
        })?;
        f(world)
    }

    fn vehicle(&self, parent_id: ActorId, blueprint: &str) -> Result<Vehicle> {
        match lock(&self.actors).get(&parent_id) {
            Some(SpawnedActor::Vehicle(vehicle)) => Ok(vehicle.clone()),
            _ => Err(ActorFactoryError::sensor_spawn(
                blueprint,
                parent_name(parent_id),
                "parent vehicle not found",
            )),
        }
    }

    /// 取出底层相机对象
    pub fn camera(&self, actor_id: ActorId) -> Option<Sensor> {
        match lock(&self.actors).get(&actor_id) {
            Some(SpawnedActor::Camera(sensor)) => Some(sensor.clone()),
            _ => None,
        }
    }

    fn spawn_point(world: &mut World, blueprint: &str) -> Result<CarlaTransform> {
        let point = world
            .map()
            .recommended_spawn_points()
            .get(0)
            .cloned()
            .ok_or_else(|| ActorFactoryError::vehicle_spawn(blueprint, "no recommended spawn points"))?;
        info!(vehicle_blueprint = blueprint, point = ?point.location, "using default spawn point");
        Ok(point)
    }

    fn create_vehicle(
        world: &mut World,
        blueprint: &str,
        transform: Option<Transform>,
    ) -> Result<Vehicle> {
        let vehicle_bp = world
            .blueprint_library()
            .find(blueprint)
            .ok_or_else(|| {
                ActorFactoryError::vehicle_spawn(blueprint, format!("blueprint '{blueprint}' not found"))
            })?;

        let at = match transform {
            Some(transform) => engine_transform(&transform),
            None => Self::spawn_point(world, blueprint)?,
        };
        let actor = world
            .spawn_actor(&vehicle_bp, &at)
            .map_err(|e| ActorFactoryError::vehicle_spawn(blueprint, e.to_string()))?;

        Vehicle::try_from(actor)
            .map_err(|_| ActorFactoryError::vehicle_spawn(blueprint, "spawned actor is not a vehicle"))
    }

    /// 相机蓝图设置属性后挂载到载具；几何属性被拒绝时不生成
    fn create_camera(
        world: &mut World,
        blueprint: &str,
        transform: &Transform,
        vehicle: &Vehicle,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<Sensor> {
        let spawn_error =
            |message: String| ActorFactoryError::sensor_spawn(blueprint, parent_name(parent_id), message);

        let mut camera_bp = world
            .blueprint_library()
            .find(blueprint)
            .ok_or_else(|| spawn_error(format!("blueprint '{blueprint}' not found")))?;
        apply_attributes(attributes, |key, value| camera_bp.set_attribute(key, value))
            .map_err(spawn_error)?;

        let actor = world
            .spawn_actor_attached(&camera_bp, &engine_transform(transform), vehicle, None)
            .map_err(|e| spawn_error(e.to_string()))?;

        Sensor::try_from(actor).map_err(|_| spawn_error("spawned actor is not a sensor".into()))
    }

    fn release(actor: SpawnedActor, actor_id: ActorId) {
        let destroyed = match actor {
            SpawnedActor::Vehicle(vehicle) => vehicle.destroy(),
            SpawnedActor::Camera(sensor) => {
                if sensor.is_listening() {
                    sensor.stop();
                }
                sensor.destroy()
            }
        };
        if !destroyed {
            warn!(actor_id, "CARLA refused to destroy actor");
        }
    }
}

impl CarlaClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let client = Client::connect(host, port, None);
        let world = client.world();
        info!(map = %world.map().name(), "connected to CARLA server");

        *lock(&self.client) = Some(client);
        *lock(&self.world) = Some(world);
        Ok(())
    }

    #[instrument(
        name = "real_carla_spawn_vehicle",
        skip(self, transform),
        fields(blueprint = %blueprint)
    )]
    async fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Option<Transform>,
    ) -> Result<ActorId> {
        let vehicle = self.with_world(|world| Self::create_vehicle(world, blueprint, transform))?;
        let actor_id = vehicle.id();

        // 载具自动驾驶，相机随车采集
        vehicle.set_autopilot(true);
        info!(actor_id, blueprint, "vehicle spawned with autopilot");
        lock(&self.actors).insert(actor_id, SpawnedActor::Vehicle(vehicle));
        Ok(actor_id)
    }

    #[instrument(
        name = "real_carla_spawn_sensor",
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
        let vehicle = self.vehicle(parent_id, blueprint)?;
        let camera = self.with_world(|world| {
            Self::create_camera(world, blueprint, &transform, &vehicle, parent_id, attributes)
        })?;

        let actor_id = camera.id();
        debug!(actor_id, blueprint, parent_id, ?transform, "camera attached");
        lock(&self.actors).insert(actor_id, SpawnedActor::Camera(camera));
        Ok(actor_id)
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let removed = lock(&self.actors).remove(&actor_id);
        if let Some(actor) = removed {
            Self::release(actor, actor_id);
            debug!(actor_id, "actor destroyed");
        }
        Ok(())
    }

    #[instrument(name = "real_carla_actor_exists", skip(self), fields(actor_id))]
    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(lock(&self.actors).contains_key(&actor_id))
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        label: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>> {
        let camera = self.camera(actor_id)?;
        Some(Box::new(CarlaSensorSource::new(label, kind, camera)))
    }
}

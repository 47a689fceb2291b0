//! Runtime handles produced by the sensor rig builder

use crate::{SensorKind, ViewName};

/// CARLA actor handle type
pub type ActorId = u32;

/// One spawned sensor of a camera rig
#[derive(Debug, Clone, PartialEq)]
pub struct SensorHandle {
    /// View the sensor renders
    pub view: ViewName,

    /// Color or depth
    pub kind: SensorKind,

    /// Engine actor handle
    pub actor_id: ActorId,
}

impl SensorHandle {
    /// Label used in logs, e.g. `main_to_main/depth`
    pub fn label(&self) -> String {
        format!("{}/{}", self.view, self.kind)
    }
}

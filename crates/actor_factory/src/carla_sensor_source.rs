//! CARLA camera SensorSource wrapper
//!
//! Wraps a CARLA native camera `Sensor` as a type implementing `SensorSource`.
//! Only compiled when `real-carla` feature is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use carla::client::Sensor;
use carla::sensor::data::Image;
use carla::sensor::{SensorData, SensorDataBase};
use contracts::{RawImage, SensorDataCallback, SensorKind, SensorSource};
use tracing::{debug, trace, warn};

/// CARLA camera wrapper
///
/// Lets the camera rig drive real cameras and mock cameras through the same API.
pub struct CarlaSensorSource {
    label: String,
    kind: SensorKind,
    sensor: Sensor,
    listening: Arc<AtomicBool>,
}

impl CarlaSensorSource {
    /// Create new CARLA camera source
    pub fn new(label: String, kind: SensorKind, sensor: Sensor) -> Self {
        Self {
            label,
            kind,
            sensor,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// CARLA camera measurement → `RawImage` (BGRA, top-down)
fn convert_image(data: &SensorData) -> Option<RawImage> {
    let image = Image::try_from(data.clone()).ok()?;
    Some(RawImage {
        frame: data.frame() as u64,
        timestamp: data.timestamp(),
        width: image.width() as u32,
        height: image.height() as u32,
        data: Bytes::copy_from_slice(image.as_raw_bytes()),
    })
}

impl SensorSource for CarlaSensorSource {
    fn sensor_id(&self) -> &str {
        &self.label
    }

    fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            warn!(sensor = %self.label, "sensor already listening");
            return;
        }

        let label = self.label.clone();
        let listening = self.listening.clone();

        debug!(sensor = %label, kind = %self.kind, "starting CARLA camera");

        self.sensor.listen(move |sensor_data| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            match convert_image(&sensor_data) {
                Some(image) => {
                    trace!(sensor = %label, frame = image.frame, "CARLA camera frame received");
                    callback(image);
                }
                None => {
                    trace!(sensor = %label, "measurement is not a camera image");
                }
            }
        });
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(sensor = %self.label, "stopping CARLA camera");
            self.sensor.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

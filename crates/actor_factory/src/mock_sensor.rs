//! Mock camera implementation
//!
//! Implements `SensorSource`; frames are pushed explicitly by
//! [`MockCarlaClient::tick`](crate::MockCarlaClient::tick) instead of an engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use contracts::{RawImage, SensorDataCallback, SensorKind, SensorSource};
use tracing::{debug, trace};

/// Mock camera configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockSensorConfig {
    /// Buffer width (pixels)
    pub width: u32,
    /// Buffer height (pixels)
    pub height: u32,
    /// Seconds between frames, used for timestamps
    pub sensor_tick: f64,
    /// BGR bytes every depth pixel carries
    pub depth_bgr: [u8; 3],
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            sensor_tick: 0.05,
            depth_bgr: [10, 20, 30],
        }
    }
}

/// Mock camera
///
/// Cheap to clone; clones share the listening flag and callback, so the
/// client can keep one copy for driving while the rig holds another.
#[derive(Clone)]
pub struct MockSensor {
    label: String,
    kind: SensorKind,
    config: MockSensorConfig,
    listening: Arc<AtomicBool>,
    callback: Arc<Mutex<Option<SensorDataCallback>>>,
}

impl MockSensor {
    /// Create new Mock camera
    pub fn new(label: impl Into<String>, kind: SensorKind, config: MockSensorConfig) -> Self {
        Self {
            label: label.into(),
            kind,
            config,
            listening: Arc::new(AtomicBool::new(false)),
            callback: Arc::new(Mutex::new(None)),
        }
    }

    /// Create Mock camera with default configuration
    pub fn with_defaults(label: impl Into<String>, kind: SensorKind) -> Self {
        Self::new(label, kind, MockSensorConfig::default())
    }

    pub fn config(&self) -> &MockSensorConfig {
        &self.config
    }

    /// Synthetic BGRA buffer for `frame`
    ///
    /// Color: a horizontal ramp offset by the frame number. Depth: every pixel
    /// encodes `depth_bgr`.
    pub fn generate_image(&self, frame: u64) -> RawImage {
        let (width, height) = (self.config.width as usize, self.config.height as usize);
        let mut data = Vec::with_capacity(width * height * 4);
        match self.kind {
            SensorKind::Color => {
                for _ in 0..height {
                    for col in 0..width {
                        let value = (col as u64 + frame) as u8;
                        data.extend_from_slice(&[value, value, value, 255]);
                    }
                }
            }
            SensorKind::Depth => {
                let [b, g, r] = self.config.depth_bgr;
                for _ in 0..width * height {
                    data.extend_from_slice(&[b, g, r, 255]);
                }
            }
        }

        RawImage {
            frame,
            timestamp: frame as f64 * self.config.sensor_tick,
            width: self.config.width,
            height: self.config.height,
            data: Bytes::from(data),
        }
    }

    /// Deliver `image` to the registered callback, if listening.
    ///
    /// Returns whether the callback ran.
    pub fn emit(&self, image: RawImage) -> bool {
        if !self.is_listening() {
            return false;
        }
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                trace!(sensor = %self.label, frame = image.frame, "mock frame sent");
                callback(image);
                true
            }
            None => false,
        }
    }
}

impl SensorSource for MockSensor {
    fn sensor_id(&self) -> &str {
        &self.label
    }

    fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
        debug!(sensor = %self.label, kind = %self.kind, "mock sensor started");
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            self.callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            debug!(sensor = %self.label, "mock sensor stopped");
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn small(kind: SensorKind) -> MockSensor {
        MockSensor::new(
            "test_camera",
            kind,
            MockSensorConfig {
                width: 4,
                height: 2,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_generated_buffers_have_declared_size() {
        for kind in [SensorKind::Color, SensorKind::Depth] {
            let image = small(kind).generate_image(3);
            assert_eq!(image.data.len(), image.expected_len());
            assert_eq!(image.frame, 3);
        }
        let depth = small(SensorKind::Depth).generate_image(0);
        assert_eq!(&depth.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_emit_requires_listening() {
        let sensor = small(SensorKind::Color);
        assert!(!sensor.emit(sensor.generate_image(1)));

        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        sensor.listen(Arc::new(move |image| {
            assert_eq!(image.width, 4);
            count_clone.fetch_add(1, Ordering::Relaxed);
        }));

        assert!(sensor.emit(sensor.generate_image(1)));
        sensor.stop();
        assert!(!sensor.emit(sensor.generate_image(2)));
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(!sensor.is_listening());
    }

    #[test]
    fn test_mock_sensor_idempotent_listen() {
        let sensor = small(SensorKind::Depth);
        let count = Arc::new(AtomicU64::new(0));
        let count1 = count.clone();
        let count2 = count.clone();

        // First call
        sensor.listen(Arc::new(move |_| {
            count1.fetch_add(1, Ordering::Relaxed);
        }));

        // Second call should be ignored
        sensor.listen(Arc::new(move |_| {
            count2.fetch_add(100, Ordering::Relaxed);
        }));

        sensor.emit(sensor.generate_image(1));
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let sensor = small(SensorKind::Color);
        let driver = sensor.clone();
        sensor.listen(Arc::new(|_| {}));
        assert!(driver.is_listening());
        assert!(driver.emit(driver.generate_image(1)));
        sensor.stop();
        assert!(!driver.is_listening());
    }
}

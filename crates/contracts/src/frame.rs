//! CapturedFrame - Frame Assembler input/output
//!
//! One persisted sample of one view. Color callbacks fill `image`, depth
//! callbacks fill `depth_map`; a merged center record carries both.

use ndarray::Array2;

use crate::{Matrix4Rows, SensorKind};

/// Captured frame record
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// Principal point (pixels)
    pub origin: [f64; 2],

    /// Focal length (pixels)
    pub focal_length: f64,

    /// Horizontal field of view (degrees)
    pub fov: f64,

    /// Engine frame counter
    pub grab_index: u64,

    /// View-to-main rigid transform, row-major
    pub pose_matrix_view_to_main: Matrix4Rows,

    /// Clip identifier
    pub simulation_id: String,

    /// Grayscale image, bottom-up rows
    pub image: Option<Array2<u8>>,

    /// Depth map, bottom-up rows
    pub depth_map: Option<Array2<f32>>,
}

/// Decoded payload of a single callback
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    Image(Array2<u8>),
    Depth(Array2<f32>),
}

impl FramePayload {
    /// Sensor kind that produces this payload
    pub fn kind(&self) -> SensorKind {
        match self {
            FramePayload::Image(_) => SensorKind::Color,
            FramePayload::Depth(_) => SensorKind::Depth,
        }
    }

    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            FramePayload::Image(image) => image.dim(),
            FramePayload::Depth(depth) => depth.dim(),
        }
    }
}

impl CapturedFrame {
    /// Attach a decoded payload to the metadata of this record
    pub fn with_payload(mut self, payload: FramePayload) -> Self {
        match payload {
            FramePayload::Image(image) => self.image = Some(image),
            FramePayload::Depth(depth) => self.depth_map = Some(depth),
        }
        self
    }

    /// Merge a later-arriving record into this one.
    ///
    /// Fields of `newer` win; `image` and `depth_map` are kept from whichever
    /// side carries them, `newer` first.
    pub fn merge(self, newer: CapturedFrame) -> CapturedFrame {
        CapturedFrame {
            image: newer.image.or(self.image),
            depth_map: newer.depth_map.or(self.depth_map),
            ..newer
        }
    }

    /// Both halves present
    pub fn is_complete(&self) -> bool {
        self.image.is_some() && self.depth_map.is_some()
    }

    /// Kinds of payload this record carries
    pub fn payload_kinds(&self) -> Vec<SensorKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.image.is_some() {
            kinds.push(SensorKind::Color);
        }
        if self.depth_map.is_some() {
            kinds.push(SensorKind::Depth);
        }
        kinds
    }
}

//! Per-sensor capture callback
//!
//! Raw engine buffer → `frame_codec` → `CapturedFrame` → `FrameAssembler`.
//! The closure owns only the session id, the view metadata and the shared
//! assembler; a torn-down session turns it into a no-op.

use std::sync::Arc;

use contracts::{CapturedFrame, RawImage, SensorDataCallback, SensorKind, ViewName};
use frame_assembler::{FrameAssembler, SaveOutcome, SessionId};
use frame_codec::CodecError;
use rig_geometry::{matrix_to_rows, View};
use tracing::{error, trace, warn};

/// Everything a callback needs to turn one buffer into a record
#[derive(Debug, Clone)]
pub struct ViewCapture {
    view_name: ViewName,
    kind: SensorKind,
    scale: u32,
    template: CapturedFrame,
}

impl ViewCapture {
    pub fn new(view: &View, kind: SensorKind, simulation_id: &str) -> Self {
        let sector = view.sector();
        Self {
            view_name: view.view_name().clone(),
            kind,
            scale: sector.scale(),
            template: CapturedFrame {
                origin: sector.origin(),
                focal_length: sector.focal_length(),
                fov: sector.fov_degrees(),
                grab_index: 0,
                pose_matrix_view_to_main: matrix_to_rows(&view.pose_matrix_view_to_main()),
                simulation_id: simulation_id.to_string(),
                image: None,
                depth_map: None,
            },
        }
    }

    pub fn view_name(&self) -> &ViewName {
        &self.view_name
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Decode `raw` into a record stamped with its grab index
    pub fn record(&self, raw: &RawImage) -> Result<CapturedFrame, CodecError> {
        let payload = frame_codec::decode(self.kind, raw, self.scale)?;
        Ok(CapturedFrame {
            grab_index: raw.frame,
            ..self.template.clone()
        }
        .with_payload(payload))
    }
}

/// Build the callback registered on one sensor
pub fn capture_callback(
    assembler: Arc<FrameAssembler>,
    session: SessionId,
    capture: ViewCapture,
) -> SensorDataCallback {
    Arc::new(move |raw: RawImage| {
        let frame = match capture.record(&raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    view = %capture.view_name,
                    kind = %capture.kind,
                    grab_index = raw.frame,
                    error = %e,
                    "dropping undecodable frame"
                );
                metrics::counter!(
                    "rig_capture_frames_dropped_total",
                    "view" => capture.view_name.to_string(),
                    "reason" => "decode"
                )
                .increment(1);
                return;
            }
        };

        match assembler.save_frame(session, &capture.view_name, frame) {
            Ok(SaveOutcome::Ignored) => {}
            Ok(outcome) => {
                trace!(view = %capture.view_name, grab_index = raw.frame, ?outcome, "frame handled");
            }
            Err(e) => {
                error!(
                    view = %capture.view_name,
                    grab_index = raw.frame,
                    error = %e,
                    "failed to persist frame"
                );
                metrics::counter!(
                    "rig_capture_frames_dropped_total",
                    "view" => capture.view_name.to_string(),
                    "reason" => "sink"
                )
                .increment(1);
            }
        }
    })
}

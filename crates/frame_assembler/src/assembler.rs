//! FrameAssembler - session registry and center-view pairing

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use contracts::{CapturedFrame, ContractError, ViewName};
use tracing::{debug, info, instrument, warn};

use crate::session::{Session, SessionConfig, SessionId};

/// Result of a single `save_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Session unknown or already closed; nothing happened
    Ignored,
    /// Center-view half stored, waiting for its pair
    Pending,
    /// Non-center record persisted standalone
    Persisted,
    /// Both center-view halves merged and persisted
    Merged,
}

impl SaveOutcome {
    fn as_label(&self) -> &'static str {
        match self {
            SaveOutcome::Ignored => "ignored",
            SaveOutcome::Pending => "pending",
            SaveOutcome::Persisted => "standalone",
            SaveOutcome::Merged => "merged",
        }
    }
}

/// Snapshot of assembler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub open_sessions: usize,
    pub pending_halves: usize,
    pub persisted: u64,
    pub pending_overwrites: u64,
}

/// Pairs center-view color/depth halves and persists records.
///
/// `Send + Sync`; share it as `Arc<FrameAssembler>` between sensor callbacks.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    next_session: AtomicU64,
    persisted: AtomicU64,
    pending_overwrites: AtomicU64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live session and return its handle
    #[instrument(
        name = "assembler_open_session",
        skip(self, config),
        fields(car = %config.car_name, sector = %config.sector, simulation_id = %config.simulation_id)
    )]
    pub fn open_session(&self, config: SessionConfig) -> SessionId {
        let id = SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed) + 1);
        let session = Arc::new(Session::new(config));
        info!(session = %id, center_view = %session.center_view, sink = session.config.sink.name(), "session opened");
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session);
        id
    }

    /// Unregister a session, dropping any unpaired half.
    ///
    /// Returns `false` when the session was not open.
    #[instrument(name = "assembler_close_session", skip(self))]
    pub fn close_session(&self, id: SessionId) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        match removed {
            Some(session) => {
                if let Some(half) = session.pending().take() {
                    debug!(
                        session = %id,
                        grab_index = half.grab_index,
                        kinds = ?half.payload_kinds(),
                        "dropping unpaired center-view half"
                    );
                }
                if let Err(e) = session.config.sink.flush() {
                    warn!(session = %id, error = %e, "sink flush failed on close");
                }
                info!(session = %id, "session closed");
                true
            }
            None => false,
        }
    }

    /// Whether `id` refers to a live session
    pub fn is_open(&self, id: SessionId) -> bool {
        self.session(id).is_some()
    }

    /// Whether the session holds an unpaired center-view half
    pub fn has_pending(&self, id: SessionId) -> bool {
        self.session(id)
            .map(|session| session.pending().is_some())
            .unwrap_or(false)
    }

    /// Route one decoded record of `view` within session `id`.
    ///
    /// Non-center views are persisted at once. Center-view halves wait in the
    /// session slot until a second one arrives; the pair is merged (the newer
    /// record wins on shared fields) and persisted. A third half arriving
    /// before the pair completes still merges with whatever is pending; that
    /// case is counted in `pending_overwrites`.
    ///
    /// # Errors
    /// Sink write failure. The slot is already cleared when this is returned.
    #[instrument(
        level = "trace",
        name = "assembler_save_frame",
        skip(self, frame),
        fields(session = %id, view = %view, grab_index = frame.grab_index)
    )]
    pub fn save_frame(
        &self,
        id: SessionId,
        view: &ViewName,
        frame: CapturedFrame,
    ) -> Result<SaveOutcome, ContractError> {
        let Some(session) = self.session(id) else {
            debug!(session = %id, view = %view, "frame for closed session ignored");
            return Ok(SaveOutcome::Ignored);
        };

        let (record, outcome) = if *view == session.center_view {
            let mut slot = session.pending();
            match slot.take() {
                None => {
                    *slot = Some(frame);
                    return Ok(SaveOutcome::Pending);
                }
                Some(pending) => {
                    self.check_pairing(&session, &pending, &frame);
                    (pending.merge(frame), SaveOutcome::Merged)
                }
            }
        } else {
            (frame, SaveOutcome::Persisted)
        };

        session.config.sink.write(view, &record)?;

        self.persisted.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "rig_capture_frames_persisted_total",
            "sector" => session.config.sector.clone(),
            "kind" => outcome.as_label()
        )
        .increment(1);
        Ok(outcome)
    }

    /// Counter snapshot
    pub fn stats(&self) -> AssemblerStats {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        AssemblerStats {
            open_sessions: sessions.len(),
            pending_halves: sessions.values().filter(|s| s.pending().is_some()).count(),
            persisted: self.persisted.load(Ordering::Relaxed),
            pending_overwrites: self.pending_overwrites.load(Ordering::Relaxed),
        }
    }

    fn session(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Flag merges that did not pair one color with one depth of the same tick
    fn check_pairing(&self, session: &Session, pending: &CapturedFrame, newer: &CapturedFrame) {
        let same_kind = pending.payload_kinds() == newer.payload_kinds();
        let same_tick = pending.grab_index == newer.grab_index;
        if same_kind || !same_tick {
            self.pending_overwrites.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(
                "rig_capture_pending_overwrites_total",
                "sector" => session.config.sector.clone()
            )
            .increment(1);
            warn!(
                simulation_id = %session.config.simulation_id,
                view = %session.center_view,
                pending_grab_index = pending.grab_index,
                grab_index = newer.grab_index,
                pending_kinds = ?pending.payload_kinds(),
                kinds = ?newer.payload_kinds(),
                "center-view half merged with an unexpected pending half"
            );
        }
    }
}

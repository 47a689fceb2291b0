//! NpzSink - one compressed NumPy archive per view per frame

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use contracts::{CapturedFrame, ContractError, FrameSink, ViewName};
use ndarray::{arr1, arr2};
use tracing::{debug, error, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::DispatcherError;
use crate::metrics::SinkMetrics;
use crate::npy;

/// Sink that writes `{base}/{simulation_id}/{view}/{simulation_id}_{view}_{grab_index:07}.npz`
pub struct NpzSink {
    name: String,
    base_path: PathBuf,
    created_dirs: Mutex<HashSet<PathBuf>>,
    metrics: SinkMetrics,
}

impl NpzSink {
    /// Create a new NpzSink rooted at `base_path`
    pub fn new(name: impl Into<String>, base_path: impl Into<PathBuf>) -> Result<Self, DispatcherError> {
        let name = name.into();
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)
            .map_err(|e| DispatcherError::sink_creation(&name, format!("{}: {e}", base_path.display())))?;

        Ok(Self {
            name,
            base_path,
            created_dirs: Mutex::new(HashSet::new()),
            metrics: SinkMetrics::new(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Archive path of one record
    pub fn record_path(&self, view: &ViewName, frame: &CapturedFrame) -> PathBuf {
        let simulation_id = &frame.simulation_id;
        self.base_path
            .join(simulation_id)
            .join(view.as_str())
            .join(format!(
                "{simulation_id}_{view}_{:07}.npz",
                frame.grab_index
            ))
    }

    /// `create_dir_all` once per directory; concurrent creation is not an error
    fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        let known = self
            .created_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(dir);
        if known {
            return Ok(());
        }
        fs::create_dir_all(dir)?;
        self.created_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dir.to_path_buf());
        debug!(sink = %self.name, dir = %dir.display(), "created output directory");
        Ok(())
    }

    fn write_archive(&self, path: &Path, frame: &CapturedFrame) -> Result<u64, DispatcherError> {
        if let Some(dir) = path.parent() {
            self.ensure_dir(dir)?;
        }

        // Readers never see a half-written archive under the final name
        let partial = path.with_extension("npz.partial");
        let written = write_members(&partial, frame)
            .and_then(|()| fs::rename(&partial, path).map_err(DispatcherError::from));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&partial) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(sink = %self.name, path = %partial.display(), error = %cleanup, "failed to remove partial archive");
                }
            }
            return Err(e);
        }
        Ok(fs::metadata(path)?.len())
    }
}

/// Write every record field as one NPY member of a deflate zip at `path`
fn write_members(path: &Path, frame: &CapturedFrame) -> Result<(), DispatcherError> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(path)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("origin.npy", options)?;
    npy::write_array(&mut zip, &arr1(&frame.origin))?;

    zip.start_file("focal.npy", options)?;
    npy::write_scalar(&mut zip, frame.focal_length)?;

    zip.start_file("fov.npy", options)?;
    npy::write_scalar(&mut zip, frame.fov)?;

    let grab_index = i64::try_from(frame.grab_index)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    zip.start_file("grab_index.npy", options)?;
    npy::write_scalar(&mut zip, grab_index)?;

    zip.start_file("RT_view_to_main.npy", options)?;
    npy::write_array(&mut zip, &arr2(&frame.pose_matrix_view_to_main))?;

    zip.start_file("clip_name.npy", options)?;
    npy::write_str(&mut zip, &frame.simulation_id)?;

    if let Some(image) = &frame.image {
        zip.start_file("image.npy", options)?;
        npy::write_array(&mut zip, image)?;
    }
    if let Some(depth) = &frame.depth_map {
        zip.start_file("sim_depth.npy", options)?;
        npy::write_array(&mut zip, depth)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}

impl FrameSink for NpzSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "npz_sink_write",
        skip(self, frame),
        fields(sink = %self.name, view = %view, grab_index = frame.grab_index)
    )]
    fn write(&self, view: &ViewName, frame: &CapturedFrame) -> Result<(), ContractError> {
        let path = self.record_path(view, frame);
        match self.write_archive(&path, frame) {
            Ok(bytes) => {
                self.metrics.record_write(bytes);
                debug!(sink = %self.name, path = %path.display(), bytes, "record written");
                Ok(())
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(sink = %self.name, path = %path.display(), error = %e, "Write failed");
                Err(ContractError::sink_write(&self.name, e.to_string()))
            }
        }
    }
}

//! JSON configuration and report helpers, plus per-line CSV export.

use crate::{CourtCalibError, CourtCalibParams, CourtCalibResult, CourtCalibrator};
use court_calib_camera::{Calib, Correspondences, ImageSize};
use court_calib_core::{Court, LineSegment};
use court_calib_lines::IdentifiedLines;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum CourtCalibIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

fn default_line_samples() -> usize {
    100
}

/// Configuration of a calibration run from files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtCalibConfig {
    /// JSON list of `[x1, y1, x2, y2]` segments.
    pub segments_path: String,
    pub image_size: ImageSize,
    #[serde(default)]
    pub output_path: Option<String>,
    /// Directory for the per-line CSV export; no export when unset.
    #[serde(default)]
    pub lines_dir: Option<String>,
    #[serde(default = "default_line_samples")]
    pub line_samples: usize,
    #[serde(default)]
    pub params: CourtCalibParams,
}

impl CourtCalibConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CourtCalibIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CourtCalibIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("court_calib_report.json"))
    }

    pub fn lines_dir(&self) -> Option<PathBuf> {
        self.lines_dir.as_ref().map(PathBuf::from)
    }

    pub fn build_params(&self) -> CourtCalibParams {
        self.params.clone()
    }

    pub fn build_calibrator(&self) -> Result<CourtCalibrator, CourtCalibError> {
        CourtCalibrator::new(self.build_params())
    }

    /// Load the segments referenced by `segments_path`.
    ///
    /// A relative path is resolved against `base_dir` when given.
    pub fn load_segments(&self, base_dir: Option<&Path>) -> Result<Vec<LineSegment>, CourtCalibIoError> {
        let path = PathBuf::from(&self.segments_path);
        let path = match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        };
        load_segments(path)
    }
}

/// Read a JSON list of `[x1, y1, x2, y2]` segments.
pub fn load_segments(path: impl AsRef<Path>) -> Result<Vec<LineSegment>, CourtCalibIoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write segments as a JSON list of `[x1, y1, x2, y2]`.
pub fn write_segments(path: impl AsRef<Path>, segments: &[LineSegment]) -> Result<(), CourtCalibIoError> {
    let json = serde_json::to_string(segments)?;
    fs::write(path, json)?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtCalibReport {
    pub config_path: String,
    pub segments_path: String,
    pub rule_type: String,
    pub image_size: ImageSize,
    pub num_segments: usize,
    #[serde(default)]
    pub lines: Option<Vec<LineSegment>>,
    #[serde(default)]
    pub identified: Option<IdentifiedLines>,
    #[serde(default)]
    pub correspondences: Option<Correspondences>,
    #[serde(default)]
    pub calib: Option<Calib>,
    #[serde(default)]
    pub reprojection_rms: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CourtCalibReport {
    /// Build a base report from the input config.
    pub fn new(cfg: &CourtCalibConfig, config_path: &Path, num_segments: usize) -> Self {
        Self {
            config_path: config_path.to_string_lossy().into_owned(),
            segments_path: cfg.segments_path.clone(),
            rule_type: cfg.params.rule_type.clone(),
            image_size: cfg.image_size,
            num_segments,
            lines: None,
            identified: None,
            correspondences: None,
            calib: None,
            reprojection_rms: None,
            error: None,
        }
    }

    /// Populate report fields from a successful calibration.
    pub fn set_result(&mut self, res: CourtCalibResult) {
        self.lines = Some(res.lines);
        self.identified = Some(res.identified);
        self.correspondences = Some(res.correspondences);
        self.calib = Some(res.calib);
        self.reprojection_rms = Some(res.reprojection_rms);
        self.error = None;
    }

    /// Record a calibration error.
    pub fn set_error(&mut self, err: CourtCalibError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CourtCalibIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CourtCalibIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Sample every court line through `calib` and write `<line_name>.csv` files
/// with an `x,y` header into `dir`, which is created if missing.
///
/// Returns the written paths in [`court_calib_core::CourtLine::ALL`] order.
pub fn write_court_lines_csv(
    calib: &Calib,
    court: &Court,
    dir: impl AsRef<Path>,
    steps: usize,
) -> Result<Vec<PathBuf>, CourtCalibIoError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (line, [p0, p1]) in court.lines() {
        let points = calib.sample_line(&p0, &p1, steps);
        let path = dir.join(format!("{}.csv", line.name()));
        let mut wtr = csv::Writer::from_path(&path)?;
        wtr.write_record(["x", "y"])?;
        for p in &points {
            wtr.write_record([p.x.to_string(), p.y.to_string()])?;
        }
        wtr.flush()?;
        debug!("wrote {} points to {}", points.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

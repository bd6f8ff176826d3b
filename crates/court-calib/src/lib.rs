//! Tennis court camera calibration from line segment detections.
//!
//! This crate wires the stages of the `court-calib-*` workspace together:
//! colinear segments are clustered into lines, the lines are assigned court
//! roles, their intersections give five court keypoints, and a planar
//! single-view solve turns those into a calibrated camera.
//!
//! ## Quickstart
//!
//! ```no_run
//! use court_calib::{load_segments, CourtCalibParams, CourtCalibrator, ImageSize};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let segments = load_segments("segments.json")?;
//! let calibrator = CourtCalibrator::new(CourtCalibParams::default())?;
//! let result = calibrator.calibrate(&segments, ImageSize::new(1392, 550))?;
//! println!("K = {}", result.calib.camera_matrix());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `court_calib::core`: line segments, court model, homography.
//! - `court_calib::lines`: segment clustering and line identification.
//! - `court_calib::camera`: camera model, solver seam and keypoint builder.
//! - [`CourtCalibrator`]: the end-to-end pipeline.
//! - [`CourtCalibConfig`] / [`CourtCalibReport`]: JSON file IO used by the CLI.

pub use court_calib_camera as camera;
pub use court_calib_core as core;
pub use court_calib_lines as lines;
pub use nalgebra;

mod error;
mod io;
mod pipeline;

pub use court_calib_camera::{Calib, CameraSolver, ImageSize, PlanarCameraSolver, SolverParams};
pub use court_calib_core::{
    init_with_level, init_with_stages, Court, CourtLine, Keypoint, LineSegment, STAGE_NAMES,
};
pub use court_calib_lines::{ClusterParams, IdentifyParams, LineRole};
pub use error::CourtCalibError;
pub use io::{
    load_segments, write_court_lines_csv, write_segments, CourtCalibConfig, CourtCalibIoError,
    CourtCalibReport,
};
pub use pipeline::{CourtCalibParams, CourtCalibResult, CourtCalibrator};

#[cfg(feature = "tracing")]
pub use court_calib_core::init_tracing;

//! Camera model and court calibration from identified lines.
//!
//! - [`Calib`]: immutable pinhole camera with distortion, pose and `P = K[R|t]`.
//! - [`CameraSolver`]: 3D-2D solve seam, with [`PlanarCameraSolver`] as the
//!   default single-view implementation for points on the court plane.
//! - [`CourtHomography`]: intersects the identified lines into the five court
//!   keypoints and runs the solver.

mod calib;
mod homography;
mod solver;

pub use calib::{distort, Calib, ImageSize};
pub use homography::{image_keypoints, CalibrationError, Correspondences, CourtHomography};
pub use solver::{CameraSolver, PlanarCameraSolver, SolveError, SolverParams, MIN_POINTS};

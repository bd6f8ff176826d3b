//! Core geometry for tennis court calibration.
//!
//! This crate is purely geometric: image line segments in Hesse normal form,
//! the parametrized court model, and a normalized DLT homography. It does not
//! depend on any image type or line detector.

mod court;
mod homography;
mod logger;
mod segment;

pub use court::{Court, CourtDefinition, CourtError, CourtLine, Keypoint};
pub use homography::{
    estimate_homography, hartley_normalize, smallest_right_singular_vector, Homography,
};
pub use segment::{closest_point, GeometryError, LineOrientation, LineSegment, PARALLEL_EPS};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, init_with_stages, stage_of, stage_target, STAGES, STAGE_NAMES};

//! Line clustering and court line identification.
//!
//! Takes the raw, fragmented segments of a line detector and turns them into
//! the five court lines needed for calibration.
//!
//! ```
//! use court_calib_core::LineSegment;
//! use court_calib_lines::{ClusterParams, SegmentClusterer};
//!
//! let clusterer = SegmentClusterer::new(ClusterParams::default());
//! let lines = clusterer.cluster(&[
//!     LineSegment::new(0.0, 0.0, 40.0, 0.0),
//!     LineSegment::new(60.0, 0.0, 100.0, 0.0),
//! ]);
//! assert_eq!(lines.len(), 1);
//! assert!((lines[0].x2() - 100.0).abs() < 1e-6);
//! ```
//!
//! Role assignment then runs on the clustered lines with
//! [`LineIdentifier::identify`].

mod cluster;
mod identify;
mod params;

pub use cluster::SegmentClusterer;
pub use identify::{IdentifiedLines, IdentifyError, LineIdentifier, LineRole, RoleAssignment};
pub use params::{ClusterParams, IdentifyParams};

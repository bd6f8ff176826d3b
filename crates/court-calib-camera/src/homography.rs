//! Keypoint correspondences from identified lines and the court solve.

use crate::{Calib, CameraSolver, ImageSize, PlanarCameraSolver, SolveError};
use court_calib_core::{Court, GeometryError, Keypoint, LineSegment};
use court_calib_lines::IdentifiedLines;
use log::debug;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("keypoint {keypoint:?}: {source}")]
    DegenerateIntersection {
        keypoint: Keypoint,
        #[source]
        source: GeometryError,
    },
    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// World/image keypoint pairs in `A, B, C, D, E` order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondences {
    pub world: [Point3<f64>; 5],
    pub image: [Point2<f64>; 5],
}

impl Correspondences {
    pub fn get(&self, keypoint: Keypoint) -> (Point3<f64>, Point2<f64>) {
        let i = keypoint.index();
        (self.world[i], self.image[i])
    }
}

/// Image keypoints as intersections of the identified lines.
///
/// `A = serve ∩ left`, `B = serve ∩ right`, `C = base ∩ left`,
/// `D = base ∩ right`, `E = serve ∩ center`.
pub fn image_keypoints(lines: &IdentifiedLines) -> Result<[Point2<f64>; 5], CalibrationError> {
    let pairs: [(Keypoint, &LineSegment, &LineSegment); 5] = [
        (Keypoint::A, lines.serveline(), lines.left_single_sideline()),
        (Keypoint::B, lines.serveline(), lines.right_single_sideline()),
        (Keypoint::C, lines.baseline(), lines.left_single_sideline()),
        (Keypoint::D, lines.baseline(), lines.right_single_sideline()),
        (Keypoint::E, lines.serveline(), lines.centerline()),
    ];
    let mut out = [Point2::origin(); 5];
    for (keypoint, a, b) in pairs {
        out[keypoint.index()] = a
            .intersect_with(b)
            .map_err(|source| CalibrationError::DegenerateIntersection { keypoint, source })?;
    }
    Ok(out)
}

/// Builds court correspondences and solves the camera for a given court.
#[derive(Clone, Debug)]
pub struct CourtHomography<S = PlanarCameraSolver> {
    court: Court,
    solver: S,
}

impl CourtHomography<PlanarCameraSolver> {
    /// Court with the default planar solver.
    pub fn new(court: Court) -> Self {
        Self::with_solver(court, PlanarCameraSolver::default())
    }
}

impl<S: CameraSolver> CourtHomography<S> {
    pub fn with_solver(court: Court, solver: S) -> Self {
        Self { court, solver }
    }

    #[inline]
    pub fn court(&self) -> &Court {
        &self.court
    }

    #[inline]
    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn correspondences(&self, lines: &IdentifiedLines) -> Result<Correspondences, CalibrationError> {
        let image = image_keypoints(lines)?;
        debug!("image keypoints: {:?}", image.map(|p| [p.x, p.y]));
        Ok(Correspondences {
            world: self.court.keypoints(),
            image,
        })
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, lines), fields(width = image_size.width, height = image_size.height))
    )]
    pub fn calibrate(
        &self,
        lines: &IdentifiedLines,
        image_size: ImageSize,
    ) -> Result<Calib, CalibrationError> {
        let c = self.correspondences(lines)?;
        Ok(self.solver.solve(&c.world, &c.image, image_size)?)
    }
}

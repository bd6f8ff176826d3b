//! End-to-end calibration: cluster, identify, intersect, solve.

use crate::CourtCalibError;
use court_calib_camera::{
    Calib, CameraSolver, Correspondences, CourtHomography, ImageSize, PlanarCameraSolver,
    SolverParams,
};
use court_calib_core::{Court, LineSegment};
use court_calib_lines::{
    ClusterParams, IdentifiedLines, IdentifyParams, LineIdentifier, SegmentClusterer,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters of every pipeline stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourtCalibParams {
    /// Court rule type, see [`court_calib_core::CourtDefinition::RULE_TYPES`].
    pub rule_type: String,
    pub cluster: ClusterParams,
    pub identify: IdentifyParams,
    pub solver: SolverParams,
}

impl Default for CourtCalibParams {
    fn default() -> Self {
        Self {
            rule_type: "ITF".to_string(),
            cluster: ClusterParams::default(),
            identify: IdentifyParams::default(),
            solver: SolverParams::default(),
        }
    }
}

/// Everything produced by one calibration run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourtCalibResult {
    /// Clustered lines; [`IdentifiedLines::index`] refers to this list.
    pub lines: Vec<LineSegment>,
    pub identified: IdentifiedLines,
    pub correspondences: Correspondences,
    pub calib: Calib,
    /// Keypoint reprojection RMS in pixels.
    pub reprojection_rms: f64,
}

/// Court calibrator holding the configured stages.
#[derive(Clone, Debug)]
pub struct CourtCalibrator<S = PlanarCameraSolver> {
    params: CourtCalibParams,
    clusterer: SegmentClusterer,
    identifier: LineIdentifier,
    homography: CourtHomography<S>,
}

impl CourtCalibrator<PlanarCameraSolver> {
    /// Calibrator with the default planar solver configured from `params.solver`.
    pub fn new(params: CourtCalibParams) -> Result<Self, CourtCalibError> {
        let solver = PlanarCameraSolver::new(params.solver.clone());
        Self::with_solver(params, solver)
    }
}

impl<S: CameraSolver> CourtCalibrator<S> {
    /// Calibrator with a custom camera solver. `params.solver` is not used.
    pub fn with_solver(params: CourtCalibParams, solver: S) -> Result<Self, CourtCalibError> {
        let court = Court::new(&params.rule_type)?;
        Ok(Self {
            clusterer: SegmentClusterer::new(params.cluster.clone()),
            identifier: LineIdentifier::new(params.identify.clone()),
            homography: CourtHomography::with_solver(court, solver),
            params,
        })
    }

    #[inline]
    pub fn params(&self) -> &CourtCalibParams {
        &self.params
    }

    #[inline]
    pub fn court(&self) -> &Court {
        self.homography.court()
    }

    /// Run the full pipeline on raw detector segments.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, segments), fields(num_segments = segments.len()))
    )]
    pub fn calibrate(
        &self,
        segments: &[LineSegment],
        image_size: ImageSize,
    ) -> Result<CourtCalibResult, CourtCalibError> {
        let lines = self.clusterer.cluster(segments);
        let identified = self.identifier.identify(&lines)?;
        debug!(
            "identified lines at indices {:?}",
            court_calib_lines::LineRole::ALL.map(|r| identified.index(r))
        );

        let correspondences = self.homography.correspondences(&identified)?;
        let calib = self.homography.solver().solve(
            &correspondences.world,
            &correspondences.image,
            image_size,
        )?;
        let reprojection_rms = calib.reprojection_rms(&correspondences.world, &correspondences.image);
        info!(
            "calibrated: fx = {:.2}, fy = {:.2}, rms = {:.4} px",
            calib.fx(),
            calib.fy(),
            reprojection_rms
        );

        Ok(CourtCalibResult {
            lines,
            identified,
            correspondences,
            calib,
            reprojection_rms,
        })
    }
}

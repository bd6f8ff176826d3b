use court_calib_camera::{CalibrationError, SolveError};
use court_calib_core::{CourtError, GeometryError, Keypoint};
use court_calib_lines::IdentifyError;

/// Failure of an end-to-end court calibration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CourtCalibError {
    #[error("configuration error: {0}")]
    Configuration(#[from] CourtError),
    #[error("insufficient line detections: {0}")]
    DetectionInsufficient(#[from] IdentifyError),
    #[error("degenerate intersection for keypoint {keypoint:?}: {source}")]
    DegenerateIntersection {
        keypoint: Keypoint,
        #[source]
        source: GeometryError,
    },
    #[error("calibration solve failed: {0}")]
    CalibrationSolveFailure(#[from] SolveError),
}

impl From<CalibrationError> for CourtCalibError {
    fn from(err: CalibrationError) -> Self {
        match err {
            CalibrationError::DegenerateIntersection { keypoint, source } => {
                Self::DegenerateIntersection { keypoint, source }
            }
            CalibrationError::Solve(e) => Self::CalibrationSolveFailure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_errors_map_to_pipeline_kinds() {
        let err: CourtCalibError = CalibrationError::DegenerateIntersection {
            keypoint: Keypoint::C,
            source: GeometryError::ParallelLines { sin_delta: 0.0 },
        }
        .into();
        assert!(matches!(
            err,
            CourtCalibError::DegenerateIntersection {
                keypoint: Keypoint::C,
                ..
            }
        ));

        let err: CourtCalibError = CalibrationError::Solve(SolveError::BehindCamera).into();
        assert_eq!(
            err,
            CourtCalibError::CalibrationSolveFailure(SolveError::BehindCamera)
        );
        assert_eq!(
            err.to_string(),
            "calibration solve failed: target is behind the camera"
        );
    }

    #[test]
    fn configuration_and_detection_errors_convert() {
        let err: CourtCalibError = CourtError::UnknownRuleType("X".into()).into();
        assert!(matches!(err, CourtCalibError::Configuration(_)));

        let err: CourtCalibError = IdentifyError::NotEnoughLines {
            horizontal: 1,
            vertical: 4,
        }
        .into();
        assert!(matches!(err, CourtCalibError::DetectionInsufficient(_)));
    }
}

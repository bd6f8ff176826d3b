//! Single-view camera solve from planar correspondences.
//!
//! [`PlanarCameraSolver`] initializes from the plane-to-image homography
//! (focal length from the orthogonality constraints, pose from the
//! decomposition of `K⁻¹H`) and refines `f`, the principal point and the
//! pose with Levenberg-Marquardt on the reprojection error. Distortion is held
//! at zero and `fx = aspect_ratio * fy`.
//!
//! A single view of a plane leaves one degree of freedom among `f` and the
//! principal point. Refinement starts from the image center and stays close
//! to it; every member of that family reprojects the court plane identically.

use crate::{Calib, ImageSize};
use court_calib_core::estimate_homography;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::{debug, warn};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn, Matrix3, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Minimum number of correspondences for a planar solve.
pub const MIN_POINTS: usize = 4;

/// Largest `|z|` accepted for a world point on the court plane.
const PLANE_EPS: f64 = 1e-9;

/// Residual (px) assigned to each coordinate of a point behind the camera.
const BEHIND_PENALTY: f64 = 1e6;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("need at least {needed} correspondences, got {got}")]
    NotEnoughPoints { needed: usize, got: usize },
    #[error("world and image point counts differ ({world} vs {image})")]
    MismatchedLengths { world: usize, image: usize },
    #[error("world points are not on the z = 0 plane (max |z| = {max_abs_z})")]
    NonPlanarTarget { max_abs_z: f64 },
    #[error("plane-to-image homography estimation failed")]
    Homography,
    #[error("focal length is not observable (1/f^2 estimate {inv_f2:.3e})")]
    DegenerateFocal { inv_f2: f64 },
    #[error("target is behind the camera")]
    BehindCamera,
    #[error("solution contains non-finite values")]
    NonFinite,
    #[error("reprojection rms {rms:.3} px exceeds {max:.3} px")]
    NotConverged { rms: f64, max: f64 },
}

/// Black-box camera solve from 3D-2D correspondences.
pub trait CameraSolver {
    fn solve(
        &self,
        world: &[Point3<f64>],
        image: &[Point2<f64>],
        image_size: ImageSize,
    ) -> Result<Calib, SolveError>;
}

/// Constraints and stopping criteria for [`PlanarCameraSolver`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Fixed `fx / fy`.
    pub aspect_ratio: f64,
    /// Opt-in: pin the principal point to the image center instead of
    /// estimating it.
    pub fix_principal_point: bool,
    /// Evaluation budget, in units of `parameters + 1` residual evaluations.
    pub max_iterations: usize,
    /// Relative tolerance on cost decrease, step size and gradient.
    pub tolerance: f64,
    /// Final RMS reprojection error (px) above which the solve fails.
    pub max_reprojection_error: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            aspect_ratio: 1.0,
            fix_principal_point: false,
            max_iterations: 100,
            tolerance: 1e-12,
            max_reprojection_error: 20.0,
        }
    }
}

/// Default planar single-view solver.
#[derive(Clone, Debug, Default)]
pub struct PlanarCameraSolver {
    params: SolverParams,
}

impl PlanarCameraSolver {
    pub fn new(params: SolverParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SolverParams {
        &self.params
    }
}

impl CameraSolver for PlanarCameraSolver {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, world, image), fields(num_points = world.len()))
    )]
    fn solve(
        &self,
        world: &[Point3<f64>],
        image: &[Point2<f64>],
        image_size: ImageSize,
    ) -> Result<Calib, SolveError> {
        if world.len() != image.len() {
            return Err(SolveError::MismatchedLengths {
                world: world.len(),
                image: image.len(),
            });
        }
        if world.len() < MIN_POINTS {
            return Err(SolveError::NotEnoughPoints {
                needed: MIN_POINTS,
                got: world.len(),
            });
        }
        let max_abs_z = world.iter().map(|p| p.z.abs()).fold(0.0_f64, f64::max);
        if !(max_abs_z <= PLANE_EPS) {
            return Err(SolveError::NonPlanarTarget { max_abs_z });
        }

        let plane: Vec<Point2<f64>> = world.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let h = estimate_homography(&plane, image).ok_or(SolveError::Homography)?;

        let ar = self.params.aspect_ratio;
        let c = image_size.center();
        let f = focal_from_homography(&h.h, c, ar)?;
        let k = intrinsics(f, ar, c);
        let (rvec, tvec) = pose_from_homography(&k, &h.h)?;
        debug!(
            "initial f = {:.2}, rvec = {:?}, tvec = {:?}",
            f,
            rvec.as_slice(),
            tvec.as_slice()
        );

        let mut problem = Reprojection {
            world,
            image,
            aspect_ratio: ar,
            fixed_center: self.params.fix_principal_point.then_some(c),
            params: DVector::zeros(0),
        };
        problem.params = problem.pack(f, c, &rvec, &tvec);

        let tol = self.params.tolerance.max(0.0);
        let (problem, report) = LevenbergMarquardt::new()
            .with_ftol(tol)
            .with_xtol(tol)
            .with_gtol(tol)
            .with_patience(self.params.max_iterations.max(1))
            .minimize(problem);
        debug!(
            "refinement stopped after {} evaluations: {:?}",
            report.number_of_evaluations, report.termination
        );

        let x = problem.params();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(SolveError::NonFinite);
        }
        let (f, c, rvec, tvec) = problem.unpack(&x);
        if !(f > 0.0) {
            return Err(SolveError::DegenerateFocal { inv_f2: 1.0 / (f * f) });
        }

        let r = Rotation3::new(rvec);
        if world.iter().any(|p| (r * p.coords + tvec).z <= 0.0) {
            return Err(SolveError::BehindCamera);
        }
        let cost = problem.residuals_at(&x).norm_squared();
        if !cost.is_finite() {
            return Err(SolveError::NonFinite);
        }

        let rms = (cost / world.len() as f64).sqrt();
        debug!("refined f = {f:.2}, c = ({:.2}, {:.2}), rms = {rms:.4} px", c.x, c.y);
        if rms > self.params.max_reprojection_error {
            warn!(
                "reprojection rms {rms:.3} px above {:.3} px",
                self.params.max_reprojection_error
            );
            return Err(SolveError::NotConverged {
                rms,
                max: self.params.max_reprojection_error,
            });
        }

        Ok(Calib::new(
            intrinsics(f, ar, c),
            [0.0; 5],
            rvec,
            tvec,
            image_size,
        ))
    }
}

fn intrinsics(f: f64, aspect_ratio: f64, c: Point2<f64>) -> Matrix3<f64> {
    Matrix3::new(
        f * aspect_ratio,
        0.0,
        c.x,
        0.0,
        f,
        c.y,
        0.0,
        0.0,
        1.0,
    )
}

/// Focal length `fy` from the two orthogonality constraints of a plane
/// homography with known principal point and aspect ratio.
///
/// With `H' = diag(1/ar, 1, 1) * T(-c) * H`, the columns of `diag(1/f, 1/f, 1) H'`
/// must be orthogonal and of equal norm; both constraints are linear in
/// `w = 1/f²` and solved in least squares.
fn focal_from_homography(h: &Matrix3<f64>, c: Point2<f64>, ar: f64) -> Result<f64, SolveError> {
    let shift = Matrix3::new(
        1.0 / ar,
        0.0,
        -c.x / ar,
        0.0,
        1.0,
        -c.y,
        0.0,
        0.0,
        1.0,
    );
    let m = shift * h;
    let a1 = m[(0, 0)] * m[(0, 1)] + m[(1, 0)] * m[(1, 1)];
    let b1 = m[(2, 0)] * m[(2, 1)];
    let a2 = m[(0, 0)].powi(2) + m[(1, 0)].powi(2) - m[(0, 1)].powi(2) - m[(1, 1)].powi(2);
    let b2 = m[(2, 0)].powi(2) - m[(2, 1)].powi(2);

    // Both constraints vanish for a fronto-parallel view.
    let norms = m.column(0).norm_squared() + m.column(1).norm_squared();
    let denom = a1 * a1 + a2 * a2;
    let inv_f2 = if denom > 1e-10 * norms * norms {
        -(a1 * b1 + a2 * b2) / denom
    } else {
        f64::NAN
    };
    if !(inv_f2 > 0.0) || !inv_f2.is_finite() {
        return Err(SolveError::DegenerateFocal { inv_f2 });
    }
    Ok(1.0 / inv_f2.sqrt())
}

/// Pose of the `z = 0` plane from `K⁻¹H`, with the rotation projected onto
/// SO(3) and the sign chosen so the plane lies in front of the camera.
fn pose_from_homography(
    k: &Matrix3<f64>,
    h: &Matrix3<f64>,
) -> Result<(Vector3<f64>, Vector3<f64>), SolveError> {
    let k_inv = k.try_inverse().ok_or(SolveError::NonFinite)?;
    let b = k_inv * h;
    let mut r1: Vector3<f64> = b.column(0).into_owned();
    let mut r2: Vector3<f64> = b.column(1).into_owned();
    let mut t: Vector3<f64> = b.column(2).into_owned();

    let scale = 0.5 * (r1.norm() + r2.norm());
    if !(scale > 1e-12) {
        return Err(SolveError::Homography);
    }
    r1 /= scale;
    r2 /= scale;
    t /= scale;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }

    let mut r = Matrix3::from_columns(&[r1, r2, r1.cross(&r2)]);
    let svd = r.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(SolveError::NonFinite);
    };
    r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u = u;
        u.column_mut(2).neg_mut();
        r = u * v_t;
    }

    if !r.iter().chain(t.iter()).all(|v| v.is_finite()) {
        return Err(SolveError::NonFinite);
    }
    Ok((Rotation3::from_matrix_unchecked(r).scaled_axis(), t))
}

/// Reprojection least-squares problem over `[f, (cx, cy), rvec, t]`.
struct Reprojection<'a> {
    world: &'a [Point3<f64>],
    image: &'a [Point2<f64>],
    aspect_ratio: f64,
    fixed_center: Option<Point2<f64>>,
    params: DVector<f64>,
}

impl Reprojection<'_> {
    fn dim(&self) -> usize {
        if self.fixed_center.is_some() {
            7
        } else {
            9
        }
    }

    fn pack(&self, f: f64, c: Point2<f64>, rvec: &Vector3<f64>, t: &Vector3<f64>) -> DVector<f64> {
        let mut x = Vec::with_capacity(self.dim());
        x.push(f);
        if self.fixed_center.is_none() {
            x.extend([c.x, c.y]);
        }
        x.extend(rvec.iter().chain(t.iter()));
        DVector::from_vec(x)
    }

    fn unpack(&self, x: &DVector<f64>) -> (f64, Point2<f64>, Vector3<f64>, Vector3<f64>) {
        let (c, off) = match self.fixed_center {
            Some(c) => (c, 1),
            None => (Point2::new(x[1], x[2]), 3),
        };
        let rvec = Vector3::new(x[off], x[off + 1], x[off + 2]);
        let t = Vector3::new(x[off + 3], x[off + 4], x[off + 5]);
        (x[0], c, rvec, t)
    }

    /// Stacked `[du, dv]` residuals. A point behind the camera contributes
    /// [`BEHIND_PENALTY`] so the step that moved it there is rejected.
    fn residuals_at(&self, x: &DVector<f64>) -> DVector<f64> {
        let (f, c, rvec, t) = self.unpack(x);
        let r = Rotation3::new(rvec);
        let fx = f * self.aspect_ratio;
        let mut out = DVector::zeros(2 * self.world.len());
        for (k, (pw, pi)) in self.world.iter().zip(self.image).enumerate() {
            let pc = r * pw.coords + t;
            if !(pc.z > 1e-9) {
                out[2 * k] = BEHIND_PENALTY;
                out[2 * k + 1] = BEHIND_PENALTY;
                continue;
            }
            out[2 * k] = fx * pc.x / pc.z + c.x - pi.x;
            out[2 * k + 1] = f * pc.y / pc.z + c.y - pi.y;
        }
        out
    }

    /// Forward differences with a step relative to each parameter.
    fn jacobian_at(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let r0 = self.residuals_at(x);
        let mut j = DMatrix::zeros(r0.len(), x.len());
        for k in 0..x.len() {
            let step = 1e-7 * (1.0 + x[k].abs());
            let mut xp = x.clone();
            xp[k] += step;
            let rp = self.residuals_at(&xp);
            j.set_column(k, &((rp - &r0) / step));
        }
        j
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for Reprojection<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(self.residuals_at(&self.params))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        Some(self.jacobian_at(&self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plane_grid() -> Vec<Point3<f64>> {
        vec![
            Point3::new(1.37, 5.485, 0.0),
            Point3::new(9.6, 5.485, 0.0),
            Point3::new(1.37, 0.0, 0.0),
            Point3::new(9.6, 0.0, 0.0),
            Point3::new(5.485, 5.485, 0.0),
        ]
    }

    fn tilted_calib() -> Calib {
        let s = 533.0_f64.sqrt();
        let (fy, fz) = (22.0 / s, -7.0 / s);
        let r = Matrix3::new(1.0, 0.0, 0.0, 0.0, fz, -fy, 0.0, fy, fz);
        let center = Vector3::new(5.485, -10.0, 7.0);
        Calib::new(
            Matrix3::new(800.0, 0.0, 695.5, 0.0, 800.0, 274.5, 0.0, 0.0, 1.0),
            [0.0; 5],
            Rotation3::from_matrix_unchecked(r).scaled_axis(),
            -(r * center),
            ImageSize::new(1392, 550),
        )
    }

    #[test]
    fn focal_from_exact_homography() {
        let calib = tilted_calib();
        let world = plane_grid();
        let image = calib.project(&world);
        let plane: Vec<_> = world.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let h = estimate_homography(&plane, &image).unwrap();
        let f = focal_from_homography(&h.h, calib.image_size().center(), 1.0).unwrap();
        assert_relative_eq!(f, 800.0, epsilon = 1e-3);
    }

    #[test]
    fn recovers_exact_camera() {
        let truth = tilted_calib();
        let world = plane_grid();
        let image = truth.project(&world);
        let calib = PlanarCameraSolver::default()
            .solve(&world, &image, truth.image_size())
            .expect("solve");
        assert_relative_eq!(calib.fx(), 800.0, epsilon = 1e-3);
        assert_relative_eq!(calib.fy(), 800.0, epsilon = 1e-3);
        assert!(calib.reprojection_rms(&world, &image) < 1e-6);
        assert!((calib.tvec() - truth.tvec()).norm() < 1e-5);
    }

    #[test]
    fn fixed_principal_point_stays_at_image_center() {
        let truth = tilted_calib();
        let world = plane_grid();
        let image = truth.project(&world);
        let params = SolverParams {
            fix_principal_point: true,
            ..SolverParams::default()
        };
        let calib = PlanarCameraSolver::new(params)
            .solve(&world, &image, truth.image_size())
            .expect("solve");
        assert_eq!(calib.principal_point(), truth.image_size().center());
        assert_relative_eq!(calib.fy(), 800.0, epsilon = 1e-3);
    }

    #[test]
    fn fronto_parallel_view_has_no_focal() {
        let calib = Calib::new(
            Matrix3::new(800.0, 0.0, 695.5, 0.0, 800.0, 274.5, 0.0, 0.0, 1.0),
            [0.0; 5],
            Vector3::zeros(),
            Vector3::new(-5.0, -3.0, 20.0),
            ImageSize::new(1392, 550),
        );
        let world = plane_grid();
        let image = calib.project(&world);
        let err = PlanarCameraSolver::default()
            .solve(&world, &image, calib.image_size())
            .unwrap_err();
        assert!(matches!(err, SolveError::DegenerateFocal { .. }), "{err:?}");
    }

    #[test]
    fn rejects_bad_input() {
        let solver = PlanarCameraSolver::default();
        let size = ImageSize::new(640, 480);
        let world = plane_grid();
        let image = vec![Point2::new(0.0, 0.0); 5];

        assert_eq!(
            solver.solve(&world[..3], &image[..3], size).unwrap_err(),
            SolveError::NotEnoughPoints { needed: 4, got: 3 }
        );
        assert_eq!(
            solver.solve(&world, &image[..4], size).unwrap_err(),
            SolveError::MismatchedLengths { world: 5, image: 4 }
        );

        let mut lifted = world.clone();
        lifted[2].z = 0.5;
        assert!(matches!(
            solver.solve(&lifted, &image, size),
            Err(SolveError::NonPlanarTarget { .. })
        ));
    }

    #[test]
    fn large_residuals_fail() {
        let truth = tilted_calib();
        let world = plane_grid();
        let mut image = truth.project(&world);
        // Off the service line by far more than the allowed error.
        image[4].y -= 150.0;
        let params = SolverParams {
            max_reprojection_error: 1.0,
            ..SolverParams::default()
        };
        let result = PlanarCameraSolver::new(params).solve(&world, &image, truth.image_size());
        assert!(result.is_err(), "{result:?}");
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let p: SolverParams = serde_json::from_str(r#"{"max_iterations": 5}"#).unwrap();
        assert_eq!(p.max_iterations, 5);
        assert!(!p.fix_principal_point);
        assert_eq!(p.max_reprojection_error, 20.0);
    }
}

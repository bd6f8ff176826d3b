//! Calibrated pinhole camera with Brown-Conrady distortion.

use nalgebra::{Matrix3, Matrix3x4, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel-center convention: `((w - 1) / 2, (h - 1) / 2)`.
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.width as f64 - 1.0) / 2.0,
            (self.height as f64 - 1.0) / 2.0,
        )
    }
}

/// Camera intrinsics, distortion and pose of the court plane.
///
/// `x_cam = R(rvec) * X_world + tvec`. Distortion is `[k1, k2, p1, p2, k3]`.
/// The projection matrix `P = K [R | t]` is derived and kept in sync by
/// construction; the value is never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "CalibRecord", into = "CalibRecord")]
pub struct Calib {
    camera_matrix: Matrix3<f64>,
    dist_coeffs: [f64; 5],
    rvec: Vector3<f64>,
    tvec: Vector3<f64>,
    image_size: ImageSize,
    projection: Matrix3x4<f64>,
}

impl Calib {
    pub fn new(
        camera_matrix: Matrix3<f64>,
        dist_coeffs: [f64; 5],
        rvec: Vector3<f64>,
        tvec: Vector3<f64>,
        image_size: ImageSize,
    ) -> Self {
        let r = Rotation3::new(rvec).into_inner();
        let mut rt = Matrix3x4::zeros();
        rt.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        rt.set_column(3, &tvec);
        Self {
            camera_matrix,
            dist_coeffs,
            rvec,
            tvec,
            image_size,
            projection: camera_matrix * rt,
        }
    }

    #[inline]
    pub fn camera_matrix(&self) -> &Matrix3<f64> {
        &self.camera_matrix
    }

    #[inline]
    pub fn dist_coeffs(&self) -> &[f64; 5] {
        &self.dist_coeffs
    }

    /// Axis-angle rotation, world to camera.
    #[inline]
    pub fn rvec(&self) -> &Vector3<f64> {
        &self.rvec
    }

    #[inline]
    pub fn tvec(&self) -> &Vector3<f64> {
        &self.tvec
    }

    #[inline]
    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    /// `P = K [R | t]`.
    #[inline]
    pub fn projection_matrix(&self) -> &Matrix3x4<f64> {
        &self.projection
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        Rotation3::new(self.rvec).into_inner()
    }

    #[inline]
    pub fn fx(&self) -> f64 {
        self.camera_matrix[(0, 0)]
    }

    #[inline]
    pub fn fy(&self) -> f64 {
        self.camera_matrix[(1, 1)]
    }

    #[inline]
    pub fn principal_point(&self) -> Point2<f64> {
        Point2::new(self.camera_matrix[(0, 2)], self.camera_matrix[(1, 2)])
    }

    /// Camera center in world coordinates, `-Rᵀ t`.
    pub fn camera_center(&self) -> Point3<f64> {
        Point3::from(-(self.rotation_matrix().transpose() * self.tvec))
    }

    /// Project one world point to pixels.
    pub fn project_point(&self, point: &Point3<f64>) -> Point2<f64> {
        let pc = self.rotation_matrix() * point.coords + self.tvec;
        self.project_camera(&pc)
    }

    /// Project world points to pixels.
    pub fn project(&self, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
        let r = self.rotation_matrix();
        points
            .iter()
            .map(|p| self.project_camera(&(r * p.coords + self.tvec)))
            .collect()
    }

    fn project_camera(&self, pc: &Vector3<f64>) -> Point2<f64> {
        let (x, y) = distort(pc.x / pc.z, pc.y / pc.z, &self.dist_coeffs);
        let k = &self.camera_matrix;
        Point2::new(
            k[(0, 0)] * x + k[(0, 1)] * y + k[(0, 2)],
            k[(1, 1)] * y + k[(1, 2)],
        )
    }

    /// Root mean square of the per-point pixel distances.
    ///
    /// Returns `0.0` for empty input; extra points on either side are ignored.
    pub fn reprojection_rms(&self, world: &[Point3<f64>], image: &[Point2<f64>]) -> f64 {
        let n = world.len().min(image.len());
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .project(&world[..n])
            .iter()
            .zip(image)
            .map(|(p, q)| (p - q).norm_squared())
            .sum();
        (sum / n as f64).sqrt()
    }

    /// Whether `p` lies in `[0, width) x [0, height)`.
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        p.x >= 0.0
            && p.y >= 0.0
            && p.x < self.image_size.width as f64
            && p.y < self.image_size.height as f64
    }

    /// Sample `steps` points uniformly from `p0` to `p1` (inclusive) in world
    /// space, project them and keep the ones inside the image.
    ///
    /// Points at or behind the camera plane are dropped before projection.
    pub fn sample_line(&self, p0: &Point3<f64>, p1: &Point3<f64>, steps: usize) -> Vec<Point2<f64>> {
        let world: Vec<Point3<f64>> = match steps {
            0 => Vec::new(),
            1 => vec![*p0],
            _ => (0..steps)
                .map(|i| {
                    let t = i as f64 / (steps - 1) as f64;
                    p0 + (p1 - p0) * t
                })
                .collect(),
        };
        let r = self.rotation_matrix();
        world
            .iter()
            .map(|p| r * p.coords + self.tvec)
            .filter(|pc| pc.z > 0.0)
            .map(|pc| self.project_camera(&pc))
            .filter(|p| self.contains(p))
            .collect()
    }
}

/// Apply radial `(k1, k2, k3)` and tangential `(p1, p2)` distortion to
/// normalized image coordinates.
pub fn distort(x: f64, y: f64, dist: &[f64; 5]) -> (f64, f64) {
    let [k1, k2, p1, p2, k3] = *dist;
    let r2 = x * x + y * y;
    let radial = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;
    let x_tan = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
    let y_tan = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
    (x * radial + x_tan, y * radial + y_tan)
}

/// On-disk form of [`Calib`]; the projection matrix is derived on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct CalibRecord {
    /// Row-major `K`.
    camera_matrix: [[f64; 3]; 3],
    dist_coeffs: [f64; 5],
    rvec: [f64; 3],
    tvec: [f64; 3],
    image_size: ImageSize,
}

impl From<CalibRecord> for Calib {
    fn from(r: CalibRecord) -> Self {
        let k = r.camera_matrix;
        let camera_matrix = Matrix3::new(
            k[0][0], k[0][1], k[0][2], //
            k[1][0], k[1][1], k[1][2], //
            k[2][0], k[2][1], k[2][2],
        );
        Calib::new(
            camera_matrix,
            r.dist_coeffs,
            Vector3::from(r.rvec),
            Vector3::from(r.tvec),
            r.image_size,
        )
    }
}

impl From<Calib> for CalibRecord {
    fn from(c: Calib) -> Self {
        let k = &c.camera_matrix;
        Self {
            camera_matrix: [
                [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
                [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
                [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
            ],
            dist_coeffs: c.dist_coeffs,
            rvec: c.rvec.into(),
            tvec: c.tvec.into(),
            image_size: c.image_size,
        }
    }
}

use nalgebra::{DMatrix, DVector, Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Plane-to-image projective map, `p_img ~ H * p_plane`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Similarity that moves the centroid of `pts` to the origin and scales the
/// mean distance to `sqrt(2)`.
///
/// Returns the normalized points and the transform `T` with `p_n = T * p`.
pub fn hartley_normalize(pts: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    if pts.is_empty() {
        return None;
    }
    let n = pts.len() as f64;
    let (sx, sy) = pts.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((out, t))
}

/// Right singular vector of `a` with the smallest singular value.
///
/// `a` is padded with zero rows when it has fewer rows than columns so the
/// null-space direction is always part of `V`.
pub fn smallest_right_singular_vector(a: DMatrix<f64>) -> Option<DVector<f64>> {
    let cols = a.ncols();
    let a = if a.nrows() < cols {
        a.resize_vertically(cols, 0.0)
    } else {
        a
    };
    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let k = svd.singular_values.imin();
    Some(v_t.row(k).transpose())
}

/// Estimate `H` such that `img ~ H * plane` from at least 4 correspondences
/// (normalized DLT).
pub fn estimate_homography(plane_pts: &[Point2<f64>], img_pts: &[Point2<f64>]) -> Option<Homography> {
    if plane_pts.len() != img_pts.len() || plane_pts.len() < 4 {
        return None;
    }

    let (r, tr) = hartley_normalize(plane_pts)?;
    let (i, ti) = hartley_normalize(img_pts)?;

    let n = plane_pts.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let (x, y) = (r[k].x, r[k].y);
        let (u, v) = (i[k].x, i[k].y);

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let h = smallest_right_singular_vector(a)?;
    let hn = Matrix3::from_row_slice(h.as_slice());

    // H = Ti^{-1} * Hn * Tr
    let h_den = ti.try_inverse()? * hn * tr;
    let s = h_den[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h_den / s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::new(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ));
        let inv = h.inverse().expect("invertible");

        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(50.0, -20.0),
            Point2::new(320.0, 200.0),
        ] {
            assert_close(inv.apply(h.apply(p)), p, 1e-9);
        }
    }

    #[test]
    fn four_points_recover_h() {
        let ground_truth = Homography::new(Matrix3::new(
            80.0, 5.0, 400.0, //
            -2.0, -30.0, 520.0, //
            0.0009, 0.04, 1.0,
        ));
        let plane = [
            Point2::new(1.37, 0.0),
            Point2::new(9.6, 0.0),
            Point2::new(9.6, 5.485),
            Point2::new(1.37, 5.485),
        ];
        let img: Vec<_> = plane.iter().map(|&p| ground_truth.apply(p)).collect();

        let recovered = estimate_homography(&plane, &img).expect("recoverable");
        for p in [Point2::new(0.0, 0.0), Point2::new(5.485, 2.0), Point2::new(10.97, 11.885)] {
            assert_close(recovered.apply(p), ground_truth.apply(p), 1e-6);
        }
    }

    #[test]
    fn dlt_handles_overdetermined_case() {
        let ground_truth = Homography::new(Matrix3::new(
            1.0, 0.2, 12.0, //
            -0.1, 0.9, 6.0, //
            0.0006, 0.0004, 1.0,
        ));

        let plane: Vec<Point2<f64>> = (0..3)
            .flat_map(|y| (0..3).map(move |x| Point2::new(x as f64 * 40.0, y as f64 * 50.0)))
            .collect();
        let img: Vec<Point2<f64>> = plane.iter().map(|&p| ground_truth.apply(p)).collect();

        let estimated = estimate_homography(&plane, &img).expect("estimate");
        for p in [Point2::new(0.0, 0.0), Point2::new(60.0, 40.0), Point2::new(80.0, 100.0)] {
            assert_close(estimated.apply(p), ground_truth.apply(p), 1e-6);
        }
    }

    #[test]
    fn mismatched_input_lengths_fail() {
        let plane = [Point2::new(0.0, 0.0); 4];
        let img = [Point2::new(1.0, 1.0); 3];
        assert!(estimate_homography(&plane, &img).is_none());
    }

    #[test]
    fn normalization_centers_and_scales() {
        let pts = [
            Point2::new(10.0, 10.0),
            Point2::new(30.0, 10.0),
            Point2::new(30.0, 30.0),
            Point2::new(10.0, 30.0),
        ];
        let (n, t) = hartley_normalize(&pts).unwrap();
        let cx: f64 = n.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy: f64 = n.iter().map(|p| p.y).sum::<f64>() / 4.0;
        assert!(cx.abs() < 1e-12 && cy.abs() < 1e-12);
        let mean: f64 = n.iter().map(|p| p.coords.norm()).sum::<f64>() / 4.0;
        assert!((mean - std::f64::consts::SQRT_2).abs() < 1e-12);
        let v = t * Vector3::new(30.0, 30.0, 1.0);
        assert_close(Point2::new(v[0], v[1]), n[2], 1e-12);
    }
}

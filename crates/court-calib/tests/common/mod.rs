#![allow(dead_code)]

use court_calib::{Calib, ImageSize, LineSegment};
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

pub const IMAGE_SIZE: ImageSize = ImageSize {
    width: 1392,
    height: 550,
};

/// 800 px camera 10 m behind and 7 m above the baseline center.
pub fn broadcast_camera() -> Calib {
    let center = Vector3::new(5.485, -10.0, 7.0);
    let fwd = (Vector3::new(5.485, 12.0, 0.0) - center).normalize();
    let right = fwd.cross(&Vector3::z()).normalize();
    let down = fwd.cross(&right);
    let r = Matrix3::from_rows(&[right.transpose(), down.transpose(), fwd.transpose()]);
    Calib::new(
        Matrix3::new(800.0, 0.0, 695.5, 0.0, 800.0, 274.5, 0.0, 0.0, 1.0),
        [0.0; 5],
        Rotation3::from_matrix_unchecked(r).scaled_axis(),
        -(r * center),
        IMAGE_SIZE,
    )
}

/// Near half of the court (baseline to net) as world segments.
fn near_court_lines() -> Vec<[Point3<f64>; 2]> {
    let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
    vec![
        [p(0.0, 0.0), p(10.97, 0.0)],
        [p(1.37, 5.485), p(9.6, 5.485)],
        [p(1.37, 0.0), p(1.37, 11.885)],
        [p(9.6, 0.0), p(9.6, 11.885)],
        [p(5.485, 5.485), p(5.485, 11.885)],
        [p(0.0, 0.0), p(0.0, 11.885)],
        [p(10.97, 0.0), p(10.97, 11.885)],
    ]
}

/// Detector-like output: every near-court line broken into three pieces
/// with gaps, some pieces reversed, plus two short clutter segments.
pub fn fragmented_segments(calib: &Calib) -> Vec<LineSegment> {
    let pieces = [(0.0, 0.2), (0.3, 0.55), (0.65, 1.0)];
    let mut out = Vec::new();
    for (k, [a, b]) in near_court_lines().into_iter().enumerate() {
        for (j, (t0, t1)) in pieces.iter().enumerate() {
            let w0 = a + (b - a) * *t0;
            let w1 = a + (b - a) * *t1;
            let img = calib.project(&[w0, w1]);
            let s = LineSegment::from_points(img[0], img[1]);
            out.push(if (k + j) % 2 == 0 { s } else { s.reversed() });
        }
    }
    out.push(LineSegment::new(100.0, 50.0, 130.0, 52.0));
    out.push(LineSegment::new(1300.0, 100.0, 1302.0, 160.0));
    out
}

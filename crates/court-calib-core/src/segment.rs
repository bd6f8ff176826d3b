//! Image line segments in endpoint and Hesse normal form.
//!
//! A segment is stored by its two endpoints and carries the derived
//! `(rho, theta)` of its supporting line, `n = (cos θ, sin θ)`,
//! `n · p = ρ`, with `ρ >= 0` and `θ` wrapped to (−π, π].

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Lines whose normals satisfy `|sin(θ2 − θ1)|` below this value do not
/// intersect.
pub const PARALLEL_EPS: f64 = 1e-6;

/// Errors from line-line geometry.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    #[error("lines are parallel (|sin(dtheta)| = {sin_delta:.3e})")]
    ParallelLines { sin_delta: f64 },
}

/// Coarse orientation of a segment, derived from its normal angle.
///
/// `Vertical` means the normal lies within ±45° of the x-axis (mod π), so the
/// segment itself runs mostly along the image y-axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrientation {
    Horizontal,
    Vertical,
}

/// Immutable 2D line segment in image pixel coordinates.
///
/// Serialized as `[x1, y1, x2, y2]`; the Hesse form is recomputed on load.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct LineSegment {
    p1: Point2<f64>,
    p2: Point2<f64>,
    rho: f64,
    theta: f64,
    length: f64,
    orientation: LineOrientation,
}

impl LineSegment {
    /// Build a segment from endpoint coordinates.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let mut theta = PI - (x2 - x1).atan2(y2 - y1);
        let mut rho = x1 * theta.cos() + y1 * theta.sin();
        if rho < 0.0 {
            rho = -rho;
            theta -= PI;
        }
        let theta = wrap_angle(theta);

        let orientation = if theta.cos().abs() > theta.sin().abs() {
            LineOrientation::Vertical
        } else {
            LineOrientation::Horizontal
        };

        Self {
            p1: Point2::new(x1, y1),
            p2: Point2::new(x2, y2),
            rho,
            theta,
            length: (x2 - x1).hypot(y2 - y1),
            orientation,
        }
    }

    pub fn from_points(p1: Point2<f64>, p2: Point2<f64>) -> Self {
        Self::new(p1.x, p1.y, p2.x, p2.y)
    }

    #[inline]
    pub fn x1(&self) -> f64 {
        self.p1.x
    }

    #[inline]
    pub fn y1(&self) -> f64 {
        self.p1.y
    }

    #[inline]
    pub fn x2(&self) -> f64 {
        self.p2.x
    }

    #[inline]
    pub fn y2(&self) -> f64 {
        self.p2.y
    }

    /// First endpoint.
    #[inline]
    pub fn p1(&self) -> Point2<f64> {
        self.p1
    }

    /// Second endpoint.
    #[inline]
    pub fn p2(&self) -> Point2<f64> {
        self.p2
    }

    #[inline]
    pub fn endpoints(&self) -> [Point2<f64>; 2] {
        [self.p1, self.p2]
    }

    /// Perpendicular distance of the supporting line from the origin (>= 0).
    #[inline]
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Angle of the line normal in radians, in (−π, π].
    #[inline]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[inline]
    pub fn orientation(&self) -> LineOrientation {
        self.orientation
    }

    #[inline]
    pub fn midpoint(&self) -> Point2<f64> {
        nalgebra::center(&self.p1, &self.p2)
    }

    /// Unit normal `(cos θ, sin θ)` of the supporting line.
    #[inline]
    pub fn normal(&self) -> Vector2<f64> {
        Vector2::new(self.theta.cos(), self.theta.sin())
    }

    /// Distance from `point` to the infinite supporting line.
    pub fn distance_to(&self, point: Point2<f64>) -> f64 {
        (self.normal().dot(&point.coords) - self.rho).abs()
    }

    /// Orthogonal projection of `point` onto the supporting line.
    pub fn closest_point(&self, point: Point2<f64>) -> Point2<f64> {
        closest_point(self.rho, self.theta, point)
    }

    /// Intersection of the two supporting lines.
    ///
    /// Solves `[cos θ1, sin θ1; cos θ2, sin θ2] · [x, y]ᵀ = [ρ1, ρ2]ᵀ`.
    /// The result does not depend on argument order.
    pub fn intersect_with(&self, other: &LineSegment) -> Result<Point2<f64>, GeometryError> {
        let (s1, c1) = self.theta.sin_cos();
        let (s2, c2) = other.theta.sin_cos();
        let det = c1 * s2 - s1 * c2;
        if det.abs() < PARALLEL_EPS {
            return Err(GeometryError::ParallelLines {
                sin_delta: det.abs(),
            });
        }
        let x = (self.rho * s2 - other.rho * s1) / det;
        let y = (other.rho * c1 - self.rho * c2) / det;
        Ok(Point2::new(x, y))
    }

    /// Same segment with endpoints swapped.
    pub fn reversed(&self) -> Self {
        Self::from_points(self.p2, self.p1)
    }

    #[inline]
    pub fn to_array(&self) -> [f64; 4] {
        [self.p1.x, self.p1.y, self.p2.x, self.p2.y]
    }
}

impl From<[f64; 4]> for LineSegment {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<LineSegment> for [f64; 4] {
    fn from(s: LineSegment) -> Self {
        s.to_array()
    }
}

/// Orthogonal projection of `point` onto the line `x cos θ + y sin θ = ρ`.
pub fn closest_point(rho: f64, theta: f64, point: Point2<f64>) -> Point2<f64> {
    let n = Vector2::new(theta.cos(), theta.sin());
    let offset = n.dot(&point.coords) - rho;
    point - n * offset
}

fn wrap_angle(theta: f64) -> f64 {
    let mut t = theta;
    while t > PI {
        t -= TAU;
    }
    while t <= -PI {
        t += TAU;
    }
    t
}

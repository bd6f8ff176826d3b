//! Colinear segment clustering.
//!
//! Two segments are adjacent when their Hesse parameters are within
//! `rho_threshold` pixels and `theta_threshold` degrees (mod π). Clusters are
//! the connected components of that relation, so chains of adjacent segments
//! end up in one line even when their extremities are not directly adjacent.
//! Each cluster is replaced by a single segment fitted through all member
//! endpoints.

use crate::ClusterParams;
use court_calib_core::{
    closest_point, hartley_normalize, smallest_right_singular_vector, LineOrientation,
    LineSegment,
};
use log::{debug, warn};
use nalgebra::{DMatrix, Point2, Vector3};
use std::f64::consts::PI;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Groups fragmented segments into full lines.
#[derive(Clone, Debug, Default)]
pub struct SegmentClusterer {
    params: ClusterParams,
}

impl SegmentClusterer {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// Direct adjacency test between two segments.
    pub fn is_adjacent(&self, a: &LineSegment, b: &LineSegment) -> bool {
        let d_rho = (a.rho() - b.rho()).abs();
        let d_theta = ((a.theta() - b.theta()) % PI).abs().to_degrees();
        d_rho < self.params.rho_threshold && d_theta < self.params.theta_threshold
    }

    /// Cluster label of every input segment.
    ///
    /// Labels are dense and numbered in order of the smallest segment index
    /// of each cluster.
    pub fn cluster_labels(&self, segments: &[LineSegment]) -> Vec<usize> {
        let n = segments.len();
        let mut sets = DisjointSets::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                if self.is_adjacent(&segments[i], &segments[j]) {
                    sets.union(i, j);
                }
            }
        }

        let mut label_of_root = vec![usize::MAX; n];
        let mut next = 0;
        (0..n)
            .map(|i| {
                let root = sets.find(i);
                if label_of_root[root] == usize::MAX {
                    label_of_root[root] = next;
                    next += 1;
                }
                label_of_root[root]
            })
            .collect()
    }

    /// Member indices of every cluster, in label order.
    pub fn clusters(&self, segments: &[LineSegment]) -> Vec<Vec<usize>> {
        let labels = self.cluster_labels(segments);
        let count = labels.iter().map(|&l| l + 1).max().unwrap_or(0);
        let mut members = vec![Vec::new(); count];
        for (i, label) in labels.into_iter().enumerate() {
            members[label].push(i);
        }
        members
    }

    /// Merge colinear segments, one output line per cluster.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, segments), fields(num_segments = segments.len()))
    )]
    pub fn cluster(&self, segments: &[LineSegment]) -> Vec<LineSegment> {
        let clusters = self.clusters(segments);
        let lines: Vec<LineSegment> = clusters
            .iter()
            .map(|members| merge_cluster(segments, members))
            .collect();
        debug!(
            "clustered {} segments into {} lines",
            segments.len(),
            lines.len()
        );
        lines
    }
}

struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Line `x cos θ + y sin θ = ρ` fitted through a point cloud.
#[derive(Clone, Copy, Debug)]
struct FittedLine {
    rho: f64,
    theta: f64,
    /// `|p| < |m|` in `m x + p y = 1`: extremities are taken along y.
    steep: bool,
}

/// Least-squares line through `points` using the homogeneous form of
/// `m x + p y = 1`, i.e. `a x + b y + c = 0`, solved by SVD on normalized
/// coordinates. Lines through the origin (`c = 0`) are representable.
fn fit_line(points: &[Point2<f64>]) -> Option<FittedLine> {
    let (normalized, t) = hartley_normalize(points)?;
    let mut design = DMatrix::<f64>::zeros(normalized.len(), 3);
    for (k, p) in normalized.iter().enumerate() {
        design[(k, 0)] = p.x;
        design[(k, 1)] = p.y;
        design[(k, 2)] = 1.0;
    }
    let ln = smallest_right_singular_vector(design)?;
    // l_n . (T p) = 0  =>  l = T^T l_n
    let l = t.transpose() * Vector3::new(ln[0], ln[1], ln[2]);
    let (a, b, c) = (l[0], l[1], l[2]);

    let norm = a.hypot(b);
    if !(norm > 1e-12) {
        return None;
    }
    let (mut cos, mut sin, mut rho) = (a / norm, b / norm, -c / norm);
    if rho < 0.0 {
        cos = -cos;
        sin = -sin;
        rho = -rho;
    }
    Some(FittedLine {
        rho,
        theta: sin.atan2(cos),
        steep: b.abs() < a.abs(),
    })
}

/// Min/max points along x (shallow) or y (steep). First occurrence wins ties.
fn extremes(points: &[Point2<f64>], steep: bool) -> (Point2<f64>, Point2<f64>) {
    let key = |p: &Point2<f64>| if steep { p.y } else { p.x };
    let mut lo = points[0];
    let mut hi = points[0];
    for p in &points[1..] {
        if key(p) < key(&lo) {
            lo = *p;
        }
        if key(p) > key(&hi) {
            hi = *p;
        }
    }
    (lo, hi)
}

/// The segment itself, endpoints ordered by the same min/max rule as fitted lines.
fn ordered(segment: &LineSegment) -> LineSegment {
    let steep = segment.orientation() == LineOrientation::Vertical;
    let (lo, _) = extremes(&segment.endpoints(), steep);
    if lo == segment.p1() {
        *segment
    } else {
        segment.reversed()
    }
}

fn merge_cluster(segments: &[LineSegment], members: &[usize]) -> LineSegment {
    let representative = &segments[members[0]];
    if members.len() == 1 {
        return ordered(representative);
    }

    let points: Vec<Point2<f64>> = members
        .iter()
        .flat_map(|&i| segments[i].endpoints())
        .collect();

    let spread = points
        .iter()
        .map(|p| (p - points[0]).norm())
        .fold(0.0_f64, f64::max);
    let fitted = if spread > f64::EPSILON {
        fit_line(&points)
    } else {
        None
    };

    let Some(line) = fitted else {
        warn!(
            "degenerate cluster of {} segments, keeping segment {}",
            members.len(),
            members[0]
        );
        return ordered(representative);
    };

    let (lo, hi) = extremes(&points, line.steep);
    let p1 = closest_point(line.rho, line.theta, lo);
    let p2 = closest_point(line.rho, line.theta, hi);
    LineSegment::from_points(p1, p2)
}

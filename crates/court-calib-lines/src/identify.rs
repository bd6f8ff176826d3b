//! Assign court roles to clustered lines.
//!
//! Horizontal lines give the baseline (longest) and the service line (next
//! longest). Vertical lines are matched against the service line anchors:
//! its first endpoint (left single sideline), its second endpoint (right
//! single sideline) and its midpoint (centerline).

use crate::IdentifyParams;
use court_calib_core::{LineOrientation, LineSegment};
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Semantic role of an identified line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    Baseline,
    Serveline,
    LeftSingleSideline,
    RightSingleSideline,
    Centerline,
}

impl LineRole {
    pub const ALL: [LineRole; 5] = [
        LineRole::Baseline,
        LineRole::Serveline,
        LineRole::LeftSingleSideline,
        LineRole::RightSingleSideline,
        LineRole::Centerline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LineRole::Baseline => "baseline",
            LineRole::Serveline => "serveline",
            LineRole::LeftSingleSideline => "left_single_sideline",
            LineRole::RightSingleSideline => "right_single_sideline",
            LineRole::Centerline => "centerline",
        }
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// Errors from role assignment.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifyError {
    #[error("not enough lines: {horizontal} horizontal (need 2), {vertical} vertical (need 3)")]
    NotEnoughLines { horizontal: usize, vertical: usize },
    #[error("no candidate line for roles {missing:?}")]
    UnassignedRoles { missing: Vec<LineRole> },
}

/// Raw per-role assignment, indices into the identifier input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub baseline: Option<usize>,
    pub serveline: Option<usize>,
    pub left_single_sideline: Option<usize>,
    pub right_single_sideline: Option<usize>,
    pub centerline: Option<usize>,
}

impl RoleAssignment {
    pub fn get(&self, role: LineRole) -> Option<usize> {
        match role {
            LineRole::Baseline => self.baseline,
            LineRole::Serveline => self.serveline,
            LineRole::LeftSingleSideline => self.left_single_sideline,
            LineRole::RightSingleSideline => self.right_single_sideline,
            LineRole::Centerline => self.centerline,
        }
    }

    /// Roles without a line, in [`LineRole::ALL`] order.
    pub fn missing(&self) -> Vec<LineRole> {
        LineRole::ALL
            .into_iter()
            .filter(|&r| self.get(r).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        LineRole::ALL.iter().all(|&r| self.get(r).is_some())
    }
}

/// The five identified lines.
///
/// Holds copies of the lines together with their index in the identifier
/// input, so it stays valid independently of the input collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedLines {
    lines: [LineSegment; 5],
    indices: [usize; 5],
}

impl IdentifiedLines {
    /// Lines and input indices in [`LineRole::ALL`] order.
    pub fn from_parts(lines: [LineSegment; 5], indices: [usize; 5]) -> Self {
        Self { lines, indices }
    }

    #[inline]
    pub fn line(&self, role: LineRole) -> &LineSegment {
        &self.lines[role.slot()]
    }

    /// Index of the line in the slice passed to [`LineIdentifier::identify`].
    #[inline]
    pub fn index(&self, role: LineRole) -> usize {
        self.indices[role.slot()]
    }

    pub fn baseline(&self) -> &LineSegment {
        self.line(LineRole::Baseline)
    }

    pub fn serveline(&self) -> &LineSegment {
        self.line(LineRole::Serveline)
    }

    pub fn left_single_sideline(&self) -> &LineSegment {
        self.line(LineRole::LeftSingleSideline)
    }

    pub fn right_single_sideline(&self) -> &LineSegment {
        self.line(LineRole::RightSingleSideline)
    }

    pub fn centerline(&self) -> &LineSegment {
        self.line(LineRole::Centerline)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LineRole, &LineSegment)> + '_ {
        LineRole::ALL.into_iter().map(move |r| (r, self.line(r)))
    }
}

/// Heuristic court line identifier.
#[derive(Clone, Debug, Default)]
pub struct LineIdentifier {
    params: IdentifyParams,
}

impl LineIdentifier {
    pub fn new(params: IdentifyParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &IdentifyParams {
        &self.params
    }

    /// Assign roles without requiring all of them.
    ///
    /// Only fails when there are too few lines per orientation.
    pub fn assign_roles(&self, lines: &[LineSegment]) -> Result<RoleAssignment, IdentifyError> {
        let (horizontal, vertical): (Vec<usize>, Vec<usize>) = (0..lines.len())
            .partition(|&i| lines[i].orientation() == LineOrientation::Horizontal);

        if horizontal.len() < 2 || vertical.len() < 3 {
            return Err(IdentifyError::NotEnoughLines {
                horizontal: horizontal.len(),
                vertical: vertical.len(),
            });
        }

        let mut out = RoleAssignment::default();
        let baseline = longest(lines, horizontal.iter().copied());
        out.baseline = baseline;
        out.serveline = longest(
            lines,
            horizontal.iter().copied().filter(|&i| Some(i) != baseline),
        );

        let Some(serveline) = out.serveline.map(|i| &lines[i]) else {
            return Ok(out);
        };

        let th = self.params.distance_threshold;
        let left_anchor = serveline.p1();
        let right_anchor = serveline.p2();
        let center_anchor = serveline.midpoint();
        for &i in &vertical {
            let line = &lines[i];
            if line.distance_to(left_anchor) < th {
                out.left_single_sideline = Some(i);
            } else if line.distance_to(right_anchor) < th {
                out.right_single_sideline = Some(i);
            } else if line.distance_to(center_anchor) < th {
                out.centerline = Some(i);
            }
        }

        debug!(
            "roles from {} horizontal / {} vertical lines: {:?}",
            horizontal.len(),
            vertical.len(),
            out
        );
        Ok(out)
    }

    /// Identify all five court lines.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, lines), fields(num_lines = lines.len()))
    )]
    pub fn identify(&self, lines: &[LineSegment]) -> Result<IdentifiedLines, IdentifyError> {
        let assignment = self.assign_roles(lines)?;
        let mut indices = [0usize; 5];
        let mut missing = Vec::new();
        for role in LineRole::ALL {
            match assignment.get(role) {
                Some(i) => indices[role.slot()] = i,
                None => missing.push(role),
            }
        }
        if !missing.is_empty() {
            return Err(IdentifyError::UnassignedRoles { missing });
        }

        Ok(IdentifiedLines {
            lines: indices.map(|i| lines[i]),
            indices,
        })
    }
}

/// Index of the longest line; ties keep the earlier one.
fn longest(lines: &[LineSegment], candidates: impl Iterator<Item = usize>) -> Option<usize> {
    let mut best: Option<usize> = None;
    for i in candidates {
        match best {
            Some(b) if lines[i].length() <= lines[b].length() => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> LineSegment {
        LineSegment::new(x1, y1, x2, y2)
    }

    /// Near-court lines of a camera behind the baseline.
    fn court_lines() -> Vec<LineSegment> {
        vec![
            seg(412.9, 524.3, 500.5, 368.1), // left single
            seg(500.5, 368.1, 890.5, 368.1), // serveline
            seg(695.5, 368.1, 695.5, 300.0), // center
            seg(318.9, 524.3, 1072.1, 524.3), // baseline
            seg(978.1, 524.3, 890.5, 368.1), // right single
        ]
    }

    #[test]
    fn roles_follow_length_and_anchors() {
        let lines = court_lines();
        let id = LineIdentifier::default().identify(&lines).expect("identified");
        assert_eq!(id.index(LineRole::Baseline), 3);
        assert_eq!(id.index(LineRole::Serveline), 1);
        assert_eq!(id.index(LineRole::LeftSingleSideline), 0);
        assert_eq!(id.index(LineRole::RightSingleSideline), 4);
        assert_eq!(id.index(LineRole::Centerline), 2);
        assert_eq!(id.baseline(), &lines[3]);
        assert_eq!(id.iter().count(), 5);
    }

    #[test]
    fn baseline_and_serveline_by_strict_length() {
        let mut lines = vec![
            seg(0.0, 100.0, 300.0, 100.0),
            seg(0.0, 200.0, 500.0, 200.0),
            seg(0.0, 300.0, 400.0, 300.0),
        ];
        lines.extend([
            seg(0.0, 0.0, 0.0, 400.0),
            seg(150.0, 0.0, 150.0, 400.0),
            seg(300.0, 0.0, 300.0, 400.0),
        ]);
        let roles = LineIdentifier::default().assign_roles(&lines).unwrap();
        assert_eq!(roles.baseline, Some(1));
        assert_eq!(roles.serveline, Some(2));
    }

    #[test]
    fn slightly_tilted_longer_line_becomes_baseline() {
        let lines = vec![
            seg(0.0, 500.0, 1000.0, 500.0),
            seg(0.0, 300.0, 1000.0, 320.0),
            seg(0.0, 400.0, 0.0, 700.0),
            seg(1000.0, 400.0, 1000.0, 700.0),
            seg(500.0, 450.0, 500.0, 700.0),
        ];
        assert!(lines[1].length() > lines[0].length());
        let roles = LineIdentifier::default().assign_roles(&lines).unwrap();
        assert_eq!(roles.baseline, Some(1));
        assert_eq!(roles.serveline, Some(0));
        assert_eq!(roles.left_single_sideline, Some(2));
        assert_eq!(roles.right_single_sideline, Some(3));
        assert_eq!(roles.centerline, Some(4));
    }

    #[test]
    fn equal_lengths_keep_the_earlier_line() {
        let lines = vec![
            seg(0.0, 100.0, 400.0, 100.0),
            seg(0.0, 200.0, 400.0, 200.0),
            seg(0.0, 300.0, 400.0, 300.0),
            seg(0.0, 0.0, 0.0, 400.0),
            seg(200.0, 0.0, 200.0, 400.0),
            seg(400.0, 0.0, 400.0, 400.0),
        ];
        let roles = LineIdentifier::default().assign_roles(&lines).unwrap();
        assert_eq!(roles.baseline, Some(0));
        assert_eq!(roles.serveline, Some(1));
        assert_eq!(roles.left_single_sideline, Some(3));
        assert_eq!(roles.centerline, Some(4));
        assert_eq!(roles.right_single_sideline, Some(5));
        assert!(roles.is_complete());
    }

    #[test]
    fn single_horizontal_line_is_not_enough() {
        let lines = vec![
            seg(0.0, 100.0, 400.0, 100.0),
            seg(0.0, 0.0, 0.0, 400.0),
            seg(200.0, 0.0, 200.0, 400.0),
            seg(400.0, 0.0, 400.0, 400.0),
        ];
        let err = LineIdentifier::default().identify(&lines).unwrap_err();
        assert_eq!(
            err,
            IdentifyError::NotEnoughLines {
                horizontal: 1,
                vertical: 3
            }
        );
    }

    #[test]
    fn two_vertical_lines_are_not_enough() {
        let mut lines = court_lines();
        lines.remove(2);
        assert!(matches!(
            LineIdentifier::default().identify(&lines),
            Err(IdentifyError::NotEnoughLines { vertical: 2, .. })
        ));
    }

    #[test]
    fn left_anchor_takes_precedence_over_center() {
        // Short service line: its midpoint is within the threshold of the
        // left anchor's line too.
        let lines = vec![
            seg(0.0, 400.0, 1000.0, 400.0),
            seg(100.0, 200.0, 130.0, 200.0),
            seg(100.0, 0.0, 100.0, 300.0),
            seg(500.0, 0.0, 500.0, 300.0),
            seg(600.0, 0.0, 600.0, 300.0),
        ];
        let roles = LineIdentifier::default().assign_roles(&lines).unwrap();
        assert_eq!(roles.left_single_sideline, Some(2));
        assert_eq!(roles.centerline, None);
        assert_eq!(roles.right_single_sideline, None);

        let err = LineIdentifier::default().identify(&lines).unwrap_err();
        assert_eq!(
            err,
            IdentifyError::UnassignedRoles {
                missing: vec![LineRole::RightSingleSideline, LineRole::Centerline]
            }
        );
    }

    #[test]
    fn later_match_overwrites_earlier_one() {
        let mut lines = court_lines();
        lines.push(seg(505.0, 368.1, 417.4, 524.3));
        let roles = LineIdentifier::default().assign_roles(&lines).unwrap();
        assert_eq!(roles.left_single_sideline, Some(5));
    }

    #[test]
    fn missing_centerline_is_reported() {
        let mut lines = court_lines();
        lines[2] = seg(1300.0, 0.0, 1300.0, 500.0);
        let err = LineIdentifier::default().identify(&lines).unwrap_err();
        assert_eq!(
            err,
            IdentifyError::UnassignedRoles {
                missing: vec![LineRole::Centerline]
            }
        );
        assert_eq!(err.to_string(), "no candidate line for roles [Centerline]");
    }
}

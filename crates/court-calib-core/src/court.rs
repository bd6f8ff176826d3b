//! Tennis court definitions and world-space line geometry.
//!
//! World frame (meters, court plane z = 0):
//!
//! ```text
//!         |   |         |         |   |
//!         +---+---------+---------+---+    <- net
//!         |   |         |         |   |
//!         |   A---------E---------B   |    <- service line
//!         |   |                   |   |
//!  y      |   |                   |   |
//!  ^      |   |                   |   |
//!  |      o---C-------------------D---+    <- baseline
//! (0,0) -> x
//! ```

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Errors when resolving a court definition.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CourtError {
    #[error("unknown court rule type `{0}` (known: ITF)")]
    UnknownRuleType(String),
}

/// Court dimensions, all in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourtDefinition {
    /// Baseline to baseline.
    pub length: f64,
    /// Doubles sideline to doubles sideline.
    pub width: f64,
    /// Singles sideline to singles sideline (service line length).
    pub serveline_width: f64,
    /// Distance from the net to the service line.
    pub serveline_offset: f64,
    pub linewidth: f64,
}

impl CourtDefinition {
    pub const ITF: Self = Self {
        length: 23.77,
        width: 10.97,
        serveline_width: 8.23,
        serveline_offset: 6.40,
        linewidth: 0.05,
    };

    /// Rule types accepted by [`CourtDefinition::for_rule_type`].
    pub const RULE_TYPES: &'static [&'static str] = &["ITF"];

    /// Look up the definition for a named rule type.
    pub fn for_rule_type(rule_type: &str) -> Result<Self, CourtError> {
        match rule_type {
            "ITF" => Ok(Self::ITF),
            other => Err(CourtError::UnknownRuleType(other.to_string())),
        }
    }
}

/// Named court lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourtLine {
    Netline,
    Baseline,
    Serveline,
    Centerline,
    LeftSideline,
    RightSideline,
    LeftSingleSideline,
    RightSingleSideline,
}

impl CourtLine {
    pub const ALL: [CourtLine; 8] = [
        CourtLine::Netline,
        CourtLine::Baseline,
        CourtLine::Serveline,
        CourtLine::Centerline,
        CourtLine::LeftSideline,
        CourtLine::RightSideline,
        CourtLine::LeftSingleSideline,
        CourtLine::RightSingleSideline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CourtLine::Netline => "netline",
            CourtLine::Baseline => "baseline",
            CourtLine::Serveline => "serveline",
            CourtLine::Centerline => "centerline",
            CourtLine::LeftSideline => "left_sideline",
            CourtLine::RightSideline => "right_sideline",
            CourtLine::LeftSingleSideline => "left_single_sideline",
            CourtLine::RightSingleSideline => "right_single_sideline",
        }
    }
}

/// Calibration keypoints, see the module-level diagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Keypoint {
    A,
    B,
    C,
    D,
    E,
}

impl Keypoint {
    pub const ALL: [Keypoint; 5] = [Keypoint::A, Keypoint::B, Keypoint::C, Keypoint::D, Keypoint::E];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A court built from a rule type. Cheap to clone, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Court {
    rule_type: String,
    definition: CourtDefinition,
}

impl Court {
    /// Build the court for a named rule type (e.g. `"ITF"`).
    pub fn new(rule_type: &str) -> Result<Self, CourtError> {
        let definition = CourtDefinition::for_rule_type(rule_type)?;
        Ok(Self::from_definition(rule_type, definition))
    }

    /// Build a court from explicit dimensions.
    pub fn from_definition(rule_type: impl Into<String>, definition: CourtDefinition) -> Self {
        Self {
            rule_type: rule_type.into(),
            definition,
        }
    }

    #[inline]
    pub fn rule_type(&self) -> &str {
        &self.rule_type
    }

    #[inline]
    pub fn definition(&self) -> &CourtDefinition {
        &self.definition
    }

    fn dims(&self) -> (f64, f64, f64, f64) {
        let d = &self.definition;
        (d.length, d.width, d.serveline_width, d.serveline_offset)
    }

    pub fn netline(&self) -> [Point3<f64>; 2] {
        let (length, width, _, _) = self.dims();
        let y = length / 2.0;
        [Point3::new(0.0, y, 0.0), Point3::new(width, y, 0.0)]
    }

    pub fn baseline(&self) -> [Point3<f64>; 2] {
        let (_, width, _, _) = self.dims();
        [Point3::new(0.0, 0.0, 0.0), Point3::new(width, 0.0, 0.0)]
    }

    pub fn serveline(&self) -> [Point3<f64>; 2] {
        let (length, width, sw, offset) = self.dims();
        let y = length / 2.0 - offset;
        [
            Point3::new((width - sw) / 2.0, y, 0.0),
            Point3::new((width + sw) / 2.0, y, 0.0),
        ]
    }

    pub fn centerline(&self) -> [Point3<f64>; 2] {
        let (length, width, _, offset) = self.dims();
        let x = width / 2.0;
        [
            Point3::new(x, length / 2.0 - offset, 0.0),
            Point3::new(x, length / 2.0 + offset, 0.0),
        ]
    }

    pub fn left_sideline(&self) -> [Point3<f64>; 2] {
        let (length, _, _, _) = self.dims();
        [Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, length, 0.0)]
    }

    pub fn right_sideline(&self) -> [Point3<f64>; 2] {
        let (length, width, _, _) = self.dims();
        [Point3::new(width, 0.0, 0.0), Point3::new(width, length, 0.0)]
    }

    pub fn left_single_sideline(&self) -> [Point3<f64>; 2] {
        let (length, width, sw, _) = self.dims();
        let x = (width - sw) / 2.0;
        [Point3::new(x, 0.0, 0.0), Point3::new(x, length, 0.0)]
    }

    pub fn right_single_sideline(&self) -> [Point3<f64>; 2] {
        let (length, width, sw, _) = self.dims();
        let x = (width + sw) / 2.0;
        [Point3::new(x, 0.0, 0.0), Point3::new(x, length, 0.0)]
    }

    /// World endpoints of a named line.
    pub fn line(&self, line: CourtLine) -> [Point3<f64>; 2] {
        match line {
            CourtLine::Netline => self.netline(),
            CourtLine::Baseline => self.baseline(),
            CourtLine::Serveline => self.serveline(),
            CourtLine::Centerline => self.centerline(),
            CourtLine::LeftSideline => self.left_sideline(),
            CourtLine::RightSideline => self.right_sideline(),
            CourtLine::LeftSingleSideline => self.left_single_sideline(),
            CourtLine::RightSingleSideline => self.right_single_sideline(),
        }
    }

    /// All named lines in [`CourtLine::ALL`] order.
    pub fn lines(&self) -> impl Iterator<Item = (CourtLine, [Point3<f64>; 2])> + '_ {
        CourtLine::ALL.into_iter().map(move |l| (l, self.line(l)))
    }

    /// Keypoints in `A, B, C, D, E` order.
    pub fn keypoints(&self) -> [Point3<f64>; 5] {
        let [a, b] = self.serveline();
        [
            Point3::new(a.x, a.y, 0.0),
            Point3::new(b.x, b.y, 0.0),
            Point3::new(a.x, 0.0, 0.0),
            Point3::new(b.x, 0.0, 0.0),
            Point3::new((a.x + b.x) / 2.0, a.y, 0.0),
        ]
    }

    pub fn keypoint(&self, keypoint: Keypoint) -> Point3<f64> {
        self.keypoints()[keypoint.index()]
    }
}

use serde::{Deserialize, Serialize};

/// Thresholds for grouping segments into lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Maximum `|rho_i - rho_j|` in pixels for two segments to be adjacent.
    pub rho_threshold: f64,
    /// Maximum `|theta_i - theta_j| mod π` in degrees for two segments to be adjacent.
    pub theta_threshold: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            rho_threshold: 50.0,
            theta_threshold: 5.0,
        }
    }
}

/// Thresholds for assigning court roles to clustered lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyParams {
    /// Maximum distance in pixels between a vertical line and a service line
    /// anchor (endpoints, midpoint) for the line to take the anchor's role.
    pub distance_threshold: f64,
}

impl Default for IdentifyParams {
    fn default() -> Self {
        Self {
            distance_threshold: 20.0,
        }
    }
}

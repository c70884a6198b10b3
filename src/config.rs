//! Tracker configuration: detection thresholds, separation policy and
//! matching strategy.

use crate::error::{EddyError, EddyResult};
use serde::{Deserialize, Serialize};

/// Scalar diagnostic the input field represents.
///
/// The mode decides how amplitude is measured and how a candidate's sign is
/// validated against the field value at its center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticMode {
    /// Sea-surface-height anomaly; amplitude is measured relative to the
    /// bounding contour level.
    SeaLevelAnomaly,
    /// Vorticity-like diagnostic; amplitude is the maximum absolute field
    /// value inside the mask.
    Vorticity,
}

impl DiagnosticMode {
    /// Parse a mode name as it appears in configuration files.
    pub fn from_name(name: &str) -> EddyResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sla" | "sea_level_anomaly" => Ok(DiagnosticMode::SeaLevelAnomaly),
            "q" | "vorticity" => Ok(DiagnosticMode::Vorticity),
            other => Err(EddyError::UnknownDiagnosticMode(other.to_string())),
        }
    }
}

/// Policy deciding whether a new detection is close enough to an old track
/// to be considered its continuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SeparationPolicy {
    /// Ellipse centered on the old position with semi-axes scaled from the
    /// local zonal/meridional grid spacing.
    Ellipse { factor: f64 },
    /// Admissible when distance <= factor * (old_radius + new_radius).
    SumOfRadii { factor: f64 },
}

impl SeparationPolicy {
    /// Parse a policy name plus its scale factor.
    pub fn from_name(name: &str, factor: f64) -> EddyResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ellipse" => Ok(SeparationPolicy::Ellipse { factor }),
            "sum_radii" | "sum_of_radii" => Ok(SeparationPolicy::SumOfRadii { factor }),
            other => Err(EddyError::UnknownSeparationPolicy(other.to_string())),
        }
    }
}

/// How detections are assigned to tracks when several candidates compete.
///
/// `Greedy` reproduces the historical first-claimed-wins pass over old
/// tracks; `Optimal` solves a minimum-cost assignment over the composite
/// separation metric instead. Greedy is the compatibility default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssignmentStrategy {
    #[default]
    Greedy,
    Optimal,
}

/// Full tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EddyConfig {
    pub diagnostic: DiagnosticMode,
    /// Accepted range for the number of grid cells enclosed by a candidate
    /// contour.
    pub pixel_min: usize,
    pub pixel_max: usize,
    /// Accepted amplitude range, field units.
    pub amplitude_min: f64,
    pub amplitude_max: f64,
    /// Normalization constants for the composite separation metric
    /// (Penven et al. 2005).
    pub area0: f64,
    pub amp0: f64,
    pub dist0: f64,
    pub separation: SeparationPolicy,
    pub assignment: AssignmentStrategy,
    /// Coarse admission cutoff on raw distance, meters. A cheap pre-filter
    /// ahead of the exact search-region test, not a hard problem limit.
    pub coarse_cutoff_m: f64,
    /// Point count contour rings are resampled to before interpolation.
    pub resample_points: usize,
    /// Retain full contour rings and shape error on every track record.
    pub track_extra_variables: bool,
}

impl Default for EddyConfig {
    fn default() -> Self {
        EddyConfig {
            diagnostic: DiagnosticMode::SeaLevelAnomaly,
            pixel_min: 8,
            pixel_max: 1000,
            amplitude_min: 0.02,
            amplitude_max: 150.0,
            area0: std::f64::consts::PI * 60_000.0 * 60_000.0,
            amp0: 0.02,
            dist0: 25_000.0,
            separation: SeparationPolicy::Ellipse { factor: 6.0 },
            assignment: AssignmentStrategy::Greedy,
            coarse_cutoff_m: 200_000.0,
            resample_points: 50,
            track_extra_variables: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_modes_and_policies() {
        assert_eq!(
            DiagnosticMode::from_name("SLA").unwrap(),
            DiagnosticMode::SeaLevelAnomaly
        );
        assert_eq!(
            DiagnosticMode::from_name("vorticity").unwrap(),
            DiagnosticMode::Vorticity
        );
        assert_eq!(
            SeparationPolicy::from_name("ellipse", 2.0).unwrap(),
            SeparationPolicy::Ellipse { factor: 2.0 }
        );
        assert_eq!(
            SeparationPolicy::from_name("sum_radii", 1.5).unwrap(),
            SeparationPolicy::SumOfRadii { factor: 1.5 }
        );
    }

    #[test]
    fn unknown_names_are_fatal() {
        assert!(matches!(
            DiagnosticMode::from_name("okubo"),
            Err(crate::error::EddyError::UnknownDiagnosticMode(_))
        ));
        assert!(matches!(
            SeparationPolicy::from_name("nearest", 1.0),
            Err(crate::error::EddyError::UnknownSeparationPolicy(_))
        ));
    }
}
